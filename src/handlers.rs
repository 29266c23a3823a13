//! Command handlers for the console.
//!
//! [`TrainingController`] owns the API client and a shared handle to the
//! page's [`NavigationGuard`]. Training commands run under the guard so that
//! only one request is outstanding at a time; the guard is released on every
//! exit path, including when the future is dropped mid-flight.

use std::rc::Rc;

use thiserror::Error;
use web_time::Instant;

use crate::api::{ApiError, ModelApi, PredictionResponse, TabularTrainResponse, TrainResponse};
use crate::archive::{ClassScan, ScanError, is_zip_file, scan_archive_bytes};
use crate::form::{
    CnnTrainingForm, FileUpload, PredictionRequest, TabularTrainingForm, TestTrainingRequest,
    ValidationError, is_tabular_file,
};
use crate::guard::{NavigationGuard, UiControl};
use crate::message::{Alert, Command, Reply};

/// Why a command did not complete.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Another training request holds the guard
    #[error("A training run is already in progress. Please wait.")]
    AlreadyBlocked,

    /// Deleting models needs the admin role
    #[error("Only administrators can delete models")]
    AdminRequired,

    /// The form or the selected file was rejected before sending
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The archive could not be read or has no class folders
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The backend or the network failed the request
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmitError {
    /// Inline message for this failure.
    pub fn alert(&self) -> Alert {
        match self {
            SubmitError::AlreadyBlocked | SubmitError::AdminRequired => {
                Alert::warning(self.to_string())
            }
            SubmitError::Api(e) => Alert::danger(format!("Request failed: {}", e)),
            SubmitError::Validation(_) | SubmitError::Scan(_) => Alert::danger(self.to_string()),
        }
    }
}

/// Processes [`Command`]s against the backend.
pub struct TrainingController<A> {
    guard: Rc<NavigationGuard>,
    api: A,
}

impl<A: ModelApi> TrainingController<A> {
    pub fn new(guard: Rc<NavigationGuard>, api: A) -> Self {
        Self { guard, api }
    }

    /// The shared navigation guard.
    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run one command. `control` is the submit control to disable while training.
    pub async fn dispatch(
        &self,
        command: Command,
        control: Option<&dyn UiControl>,
    ) -> Result<Reply, SubmitError> {
        log::debug!("Dispatching {:?}", CommandName(&command));

        // Refuse before scanning or validating anything.
        if command.is_training() && self.guard.is_busy() {
            return Err(SubmitError::AlreadyBlocked);
        }

        match command {
            Command::TrainCnnWithTestData(form) => {
                let response = self.train_with_test_data(form, control).await?;
                Ok(Reply::Trained {
                    response,
                    scan: None,
                })
            }
            Command::TrainCnnWithRealData { form, archive } => {
                let (response, scan) = self.train_with_real_data(form, archive, control).await?;
                Ok(Reply::Trained {
                    response,
                    scan: Some(scan),
                })
            }
            Command::TrainTabularWithRealData { form, dataset } => {
                let response = self.train_tabular(form, dataset, control).await?;
                Ok(Reply::TabularTrained { response })
            }
            Command::PredictCnnWithRealData(request) => {
                let response = self.predict(&request).await?;
                Ok(Reply::Predicted { response })
            }
            Command::ScanArchive(archive) => Ok(Reply::Scanned(scan_upload(&archive)?)),
            Command::ListModels(kind) => {
                let listing = self.api.list_models(kind).await?;
                log::info!("Fetched {} {} models", listing.models.len(), kind.name());
                Ok(Reply::Models {
                    kind,
                    models: listing.models,
                })
            }
            Command::DeleteModel { kind, name } => {
                if !self.api.session().is_admin() {
                    log::warn!("Refusing to delete '{}' without the admin role", name);
                    return Err(SubmitError::AdminRequired);
                }
                let response = self.api.delete_model(kind, &name).await?;
                log::info!("Deleted {} model '{}'", kind.name(), name);
                Ok(Reply::Deleted {
                    kind,
                    name,
                    message: response.message,
                })
            }
        }
    }

    async fn train_with_test_data(
        &self,
        form: CnnTrainingForm,
        control: Option<&dyn UiControl>,
    ) -> Result<TrainResponse, SubmitError> {
        form.validate()?;
        let request = TestTrainingRequest::from(&form);

        let _hold = self
            .guard
            .hold(control)
            .ok_or(SubmitError::AlreadyBlocked)?;

        let started = Instant::now();
        log::info!("Training '{}' on synthetic data", request.model_name);
        let response = self.api.train_cnn_test(&request).await;
        log_training_outcome(&request.model_name, started, &response);

        Ok(response?)
    }

    async fn train_with_real_data(
        &self,
        mut form: CnnTrainingForm,
        archive: Option<FileUpload>,
        control: Option<&dyn UiControl>,
    ) -> Result<(TrainResponse, ClassScan), SubmitError> {
        let archive = archive.ok_or(ValidationError::MissingArchive)?;
        let scan = scan_upload(&archive)?;
        form.apply_scan(&scan);
        form.validate()?;

        let _hold = self
            .guard
            .hold(control)
            .ok_or(SubmitError::AlreadyBlocked)?;

        let started = Instant::now();
        log::info!(
            "Training '{}' on '{}' ({} classes, {} images)",
            form.model_name,
            archive.file_name,
            scan.total_classes(),
            scan.total_images()
        );
        let response = self.api.train_cnn_real(&form, &archive).await;
        log_training_outcome(&form.model_name, started, &response);

        Ok((response?, scan))
    }

    async fn train_tabular(
        &self,
        form: TabularTrainingForm,
        dataset: Option<FileUpload>,
        control: Option<&dyn UiControl>,
    ) -> Result<TabularTrainResponse, SubmitError> {
        let dataset = dataset.ok_or(ValidationError::MissingDataset)?;
        if !is_tabular_file(&dataset.file_name) {
            return Err(ValidationError::NotTabular {
                file_name: dataset.file_name.clone(),
            }
            .into());
        }
        form.validate()?;

        let _hold = self
            .guard
            .hold(control)
            .ok_or(SubmitError::AlreadyBlocked)?;

        let started = Instant::now();
        log::info!(
            "Training {} model '{}' on '{}' (target '{}', {} features)",
            form.algorithm.as_str(),
            form.model_name,
            dataset.file_name,
            form.target_column,
            form.features.len()
        );
        let response = self.api.train_tabular_real(&form, &dataset).await;
        let elapsed = started.elapsed().as_secs_f32();
        match &response {
            Ok(resp) => log::info!(
                "Model '{}' trained in {:.1}s",
                resp.model_name,
                elapsed
            ),
            Err(e) => log::error!(
                "Training '{}' failed after {:.1}s: {}",
                form.model_name,
                elapsed,
                e
            ),
        }

        Ok(response?)
    }

    /// Classify one image. Prediction is quick and does not take the guard.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, SubmitError> {
        let image = request.validated_image()?;
        log::info!(
            "Classifying '{}' with model '{}'",
            image.file_name,
            request.model_name
        );
        let response = self.api.predict_cnn_real(&request.model_name, image).await?;
        log::info!(
            "'{}' classified as '{}' ({:.2})",
            image.file_name,
            response.prediction.class_name,
            response.prediction.confidence
        );
        Ok(response)
    }
}

/// Check the upload is a ZIP, then detect its classes.
fn scan_upload(archive: &FileUpload) -> Result<ClassScan, SubmitError> {
    if !is_zip_file(&archive.file_name) {
        return Err(ValidationError::NotZip {
            file_name: archive.file_name.clone(),
        }
        .into());
    }

    log::debug!("📦 Scanning '{}' ({} bytes)", archive.file_name, archive.len());
    Ok(scan_archive_bytes(&archive.data)?)
}

fn log_training_outcome(
    model_name: &str,
    started: Instant,
    response: &Result<TrainResponse, ApiError>,
) {
    let elapsed = started.elapsed().as_secs_f32();
    match response {
        Ok(resp) => log::info!(
            "Model '{}' ({}) trained in {:.1}s over {} epochs, accuracy {}",
            model_name,
            resp.architecture(),
            elapsed,
            resp.epochs_run(),
            resp.accuracy_percent()
        ),
        Err(e) => log::error!(
            "Training '{}' failed after {:.1}s: {}",
            model_name,
            elapsed,
            e
        ),
    }
}

/// Short description of a command for logs, without the archive bytes.
struct CommandName<'a>(&'a Command);

impl std::fmt::Debug for CommandName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Command::TrainCnnWithTestData(form) => write!(f, "TrainCnnWithTestData({})", form.model_name),
            Command::TrainCnnWithRealData { form, .. } => {
                write!(f, "TrainCnnWithRealData({})", form.model_name)
            }
            Command::TrainTabularWithRealData { form, .. } => {
                write!(f, "TrainTabularWithRealData({})", form.model_name)
            }
            Command::PredictCnnWithRealData(request) => {
                write!(f, "PredictCnnWithRealData({})", request.model_name)
            }
            Command::ScanArchive(archive) => write!(f, "ScanArchive({})", archive.file_name),
            Command::ListModels(kind) => write!(f, "ListModels({})", kind.name()),
            Command::DeleteModel { kind, name } => write!(f, "DeleteModel({}, {})", kind.name(), name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::future::Future;
    use std::pin::{Pin, pin};
    use std::task::{Context, Poll, Waker};

    use crate::api::{
        DeleteResponse, Evaluation, ModelKind, ModelListResponse, ModelSummary, Prediction,
    };
    use crate::archive::tests::build_zip;
    use crate::guard::tests::FakeControl;
    use crate::message::AlertLevel;
    use crate::session::{Session, User};

    /// Resolves on the second poll, to model a request in flight.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    /// API double that records calls and what the guard looked like during them.
    struct MockApi {
        guard: Rc<NavigationGuard>,
        session: Session,
        calls: RefCell<Vec<String>>,
        busy_during_call: Cell<Option<bool>>,
        sent_fields: RefCell<Vec<(String, String)>>,
        fail_with: Option<u16>,
        yield_first: bool,
    }

    impl MockApi {
        fn new(guard: Rc<NavigationGuard>) -> Self {
            Self {
                guard,
                session: Session::new("token", None),
                calls: RefCell::new(Vec::new()),
                busy_during_call: Cell::new(None),
                sent_fields: RefCell::new(Vec::new()),
                fail_with: None,
                yield_first: false,
            }
        }

        async fn respond(&self, call: String, model_name: &str) -> Result<TrainResponse, ApiError> {
            self.calls.borrow_mut().push(call);
            self.busy_during_call.set(Some(self.guard.is_busy()));
            if self.yield_first {
                YieldOnce(false).await;
            }

            match self.fail_with {
                Some(status) => Err(ApiError::Http {
                    status,
                    message: "Training exploded".to_string(),
                }),
                None => Ok(TrainResponse {
                    success: true,
                    message: None,
                    model_name: model_name.to_string(),
                    model_path: None,
                    evaluation: Evaluation {
                        accuracy: 0.9,
                        loss: 0.3,
                        model_params: None,
                    },
                    history: None,
                }),
            }
        }
    }

    impl ModelApi for MockApi {
        fn session(&self) -> Session {
            self.session.clone()
        }

        async fn train_cnn_test(
            &self,
            request: &TestTrainingRequest,
        ) -> Result<TrainResponse, ApiError> {
            self.respond(format!("test:{}", request.model_name), &request.model_name)
                .await
        }

        async fn train_cnn_real(
            &self,
            form: &CnnTrainingForm,
            archive: &FileUpload,
        ) -> Result<TrainResponse, ApiError> {
            *self.sent_fields.borrow_mut() = form.to_multipart_fields();
            self.respond(
                format!("real:{}:{}", form.model_name, archive.file_name),
                &form.model_name,
            )
            .await
        }

        async fn train_tabular_real(
            &self,
            form: &TabularTrainingForm,
            dataset: &FileUpload,
        ) -> Result<TabularTrainResponse, ApiError> {
            *self.sent_fields.borrow_mut() = form.to_multipart_fields();
            self.calls
                .borrow_mut()
                .push(format!("tabular:{}:{}", form.model_name, dataset.file_name));
            self.busy_during_call.set(Some(self.guard.is_busy()));
            if let Some(status) = self.fail_with {
                return Err(ApiError::Http {
                    status,
                    message: "Training exploded".to_string(),
                });
            }
            Ok(TabularTrainResponse {
                success: true,
                message: None,
                model_name: form.model_name.clone(),
                model_path: None,
                evaluation: serde_json::json!({"accuracy": 0.95, "f1_score": 0.94}),
                feature_importance: None,
                feature_names: form.features.clone(),
            })
        }

        async fn predict_cnn_real(
            &self,
            model_name: &str,
            image: &FileUpload,
        ) -> Result<PredictionResponse, ApiError> {
            self.calls
                .borrow_mut()
                .push(format!("predict:{}:{}", model_name, image.file_name));
            self.busy_during_call.set(Some(self.guard.is_busy()));
            Ok(PredictionResponse {
                success: true,
                model_name: model_name.to_string(),
                prediction: Prediction {
                    class_index: 1,
                    class_name: "dogs".to_string(),
                    confidence: 0.8,
                    probabilities: vec![0.2, 0.8],
                },
                image: None,
            })
        }

        async fn list_models(&self, kind: ModelKind) -> Result<ModelListResponse, ApiError> {
            self.calls.borrow_mut().push(format!("list:{}", kind.name()));
            Ok(ModelListResponse {
                models: vec![ModelSummary {
                    id: "flowers".to_string(),
                    path: None,
                    created_at: None,
                    metadata: serde_json::Value::Null,
                }],
            })
        }

        async fn delete_model(
            &self,
            kind: ModelKind,
            name: &str,
        ) -> Result<DeleteResponse, ApiError> {
            self.calls
                .borrow_mut()
                .push(format!("delete:{}:{}", kind.name(), name));
            Ok(DeleteResponse {
                success: true,
                message: None,
            })
        }
    }

    fn controller() -> TrainingController<MockApi> {
        let guard = Rc::new(NavigationGuard::headless());
        let api = MockApi::new(guard.clone());
        TrainingController::new(guard, api)
    }

    fn controller_with(configure: impl FnOnce(&mut MockApi)) -> TrainingController<MockApi> {
        let guard = Rc::new(NavigationGuard::headless());
        let mut api = MockApi::new(guard.clone());
        configure(&mut api);
        TrainingController::new(guard, api)
    }

    fn dataset() -> FileUpload {
        FileUpload::new(
            "pets.zip",
            build_zip(&["cats/a.jpg", "cats/b.png", "dogs/c.jpeg", "readme.txt"]),
        )
    }

    #[test]
    fn test_train_with_test_data() {
        let controller = controller();
        let control = FakeControl::default();

        let reply = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithTestData(CnnTrainingForm::new("synthetic")),
            Some(&control),
        ))
        .unwrap();

        assert!(matches!(reply, Reply::Trained { scan: None, .. }));
        assert_eq!(controller.api().busy_during_call.get(), Some(true));
        assert!(!controller.guard().is_busy());
        assert!(!control.disabled.get());
        assert_eq!(reply.success_alert().level, AlertLevel::Success);
    }

    #[test]
    fn test_train_with_real_data() {
        let controller = controller();
        let mut form = CnnTrainingForm::new("pets");
        form.num_classes = 7;
        form.rename_class(0, "Felines");

        let reply = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithRealData {
                form,
                archive: Some(dataset()),
            },
            None,
        ))
        .unwrap();

        let Reply::Trained {
            scan: Some(scan), ..
        } = reply
        else {
            panic!("expected a trained reply with scan");
        };
        assert_eq!(scan.class_names(), vec!["cats", "dogs"]);
        assert_eq!(scan.total_images(), 3);

        let fields = controller.api().sent_fields.borrow();
        assert!(fields.contains(&("num_classes".to_string(), "2".to_string())));
        assert!(fields.contains(&("class_name_0".to_string(), "Felines".to_string())));
        assert_eq!(
            controller.api().calls.borrow().as_slice(),
            &["real:pets:pets.zip".to_string()]
        );
    }

    #[test]
    fn test_missing_archive() {
        let controller = controller();
        let err = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithRealData {
                form: CnnTrainingForm::new("pets"),
                archive: None,
            },
            None,
        ))
        .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::MissingArchive)
        ));
        assert!(controller.api().calls.borrow().is_empty());
    }

    #[test]
    fn test_non_zip_upload() {
        let controller = controller();
        let err = pollster::block_on(controller.dispatch(
            Command::ScanArchive(FileUpload::new("pets.tar", dataset().data)),
            None,
        ))
        .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::NotZip { .. })
        ));
    }

    #[test]
    fn test_scan_archive_reply() {
        let controller = controller();
        let result = pollster::block_on(controller.dispatch(Command::ScanArchive(dataset()), None));

        let Ok(Reply::Scanned(ref scan)) = result else {
            panic!("expected a scan reply");
        };
        assert_eq!(scan.class_names(), vec!["cats", "dogs"]);
        assert_eq!(
            result.as_ref().map(Reply::success_alert).ok(),
            Some(Alert::info("Detected 2 classes with 3 images"))
        );
        assert!(controller.api().calls.borrow().is_empty());
        assert!(!controller.guard().is_busy());
    }

    #[test]
    fn test_scan_errors_stay_distinct() {
        let controller = controller();

        let corrupt = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithRealData {
                form: CnnTrainingForm::new("pets"),
                archive: Some(FileUpload::new("pets.zip", b"garbage".to_vec())),
            },
            None,
        ))
        .unwrap_err();
        assert!(matches!(corrupt, SubmitError::Scan(ScanError::ArchiveRead(_))));

        let flat = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithRealData {
                form: CnnTrainingForm::new("pets"),
                archive: Some(FileUpload::new("flat.zip", build_zip(&["a.jpg", "b.png"]))),
            },
            None,
        ))
        .unwrap_err();
        assert!(matches!(flat, SubmitError::Scan(ScanError::NoClassesDetected)));

        assert_ne!(corrupt.alert().message, flat.alert().message);
        assert!(controller.api().calls.borrow().is_empty());
        assert!(!controller.guard().is_busy());
    }

    #[test]
    fn test_single_class_archive_fails_validation() {
        let controller = controller();
        let err = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithRealData {
                form: CnnTrainingForm::new("cats-only"),
                archive: Some(FileUpload::new("cats.zip", build_zip(&["cats/a.jpg"]))),
            },
            None,
        ))
        .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::TooFewClasses { found: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_form_does_not_block() {
        let controller = controller();
        let control = FakeControl::default();
        let err = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithTestData(CnnTrainingForm::new("")),
            Some(&control),
        ))
        .unwrap_err();

        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(!control.disabled.get());
        assert!(controller.api().calls.borrow().is_empty());
    }

    #[test]
    fn test_api_failure_releases_guard() {
        let controller = controller_with(|api| api.fail_with = Some(500));
        let control = FakeControl::default();

        let err = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithTestData(CnnTrainingForm::new("doomed")),
            Some(&control),
        ))
        .unwrap_err();

        assert!(matches!(err, SubmitError::Api(ApiError::Http { status: 500, .. })));
        let alert = err.alert();
        assert_eq!(alert.level, AlertLevel::Danger);
        assert!(alert.message.contains("Training exploded"));
        assert!(!controller.guard().is_busy());
        assert!(!control.disabled.get());
        assert!(!control.loading.get());
    }

    #[test]
    fn test_concurrent_submit_is_rejected() {
        let controller = controller_with(|api| api.yield_first = true);
        let mut cx = Context::from_waker(Waker::noop());

        let mut first = pin!(controller.dispatch(
            Command::TrainCnnWithTestData(CnnTrainingForm::new("first")),
            None,
        ));
        assert!(first.as_mut().poll(&mut cx).is_pending());
        assert!(controller.guard().is_busy());

        let err = pollster::block_on(controller.dispatch(
            Command::TrainCnnWithTestData(CnnTrainingForm::new("second")),
            None,
        ))
        .unwrap_err();
        assert!(matches!(err, SubmitError::AlreadyBlocked));
        assert_eq!(err.alert().level, AlertLevel::Warning);

        let Poll::Ready(result) = first.as_mut().poll(&mut cx) else {
            panic!("first submission should finish on the second poll");
        };
        assert!(result.is_ok());
        assert!(!controller.guard().is_busy());
        assert_eq!(
            controller.api().calls.borrow().as_slice(),
            &["test:first".to_string()]
        );
    }

    #[test]
    fn test_dropped_submission_releases_guard() {
        let controller = controller_with(|api| api.yield_first = true);
        let mut cx = Context::from_waker(Waker::noop());

        {
            let mut pending = Box::pin(controller.dispatch(
                Command::TrainCnnWithTestData(CnnTrainingForm::new("abandoned")),
                None,
            ));
            assert!(pending.as_mut().poll(&mut cx).is_pending());
            assert!(controller.guard().is_busy());
        }

        assert!(!controller.guard().is_busy());
    }

    fn admin() -> Session {
        Session::new(
            "token",
            Some(User {
                username: "root".to_string(),
                roles: vec!["admin".to_string()],
            }),
        )
    }

    fn iris_form() -> TabularTrainingForm {
        let mut form = TabularTrainingForm::new("iris", "species");
        form.features = vec!["sepal_length".to_string(), "petal_length".to_string()];
        form
    }

    #[test]
    fn test_list_and_delete_skip_guard() {
        let controller = controller_with(|api| api.session = admin());
        assert!(controller.guard().start_block(None));

        let reply =
            pollster::block_on(controller.dispatch(Command::ListModels(ModelKind::Cnn), None))
                .unwrap();
        assert!(matches!(reply, Reply::Models { ref models, .. } if models.len() == 1));

        let reply = pollster::block_on(controller.dispatch(
            Command::DeleteModel {
                kind: ModelKind::Tabular,
                name: "iris".to_string(),
            },
            None,
        ))
        .unwrap();
        assert_eq!(reply.success_alert().message, "Model 'iris' deleted");

        controller.guard().end_block(None);
        assert_eq!(
            controller.api().calls.borrow().as_slice(),
            &["list:CNN".to_string(), "delete:Tabular:iris".to_string()]
        );
    }

    #[test]
    fn test_delete_requires_admin() {
        let controller = controller();
        let err = pollster::block_on(controller.dispatch(
            Command::DeleteModel {
                kind: ModelKind::Cnn,
                name: "pets".to_string(),
            },
            None,
        ))
        .unwrap_err();

        assert!(matches!(err, SubmitError::AdminRequired));
        assert_eq!(err.alert().level, AlertLevel::Warning);
        assert!(controller.api().calls.borrow().is_empty());
    }

    #[test]
    fn test_train_tabular() {
        let controller = controller();
        let control = FakeControl::default();

        let reply = pollster::block_on(controller.dispatch(
            Command::TrainTabularWithRealData {
                form: iris_form(),
                dataset: Some(FileUpload::new("Iris.CSV", b"a,b\n1,2\n".to_vec())),
            },
            Some(&control),
        ))
        .unwrap();

        assert!(matches!(reply, Reply::TabularTrained { .. }));
        assert_eq!(controller.api().busy_during_call.get(), Some(true));
        assert!(!controller.guard().is_busy());
        assert!(!control.disabled.get());
        assert_eq!(
            controller.api().calls.borrow().as_slice(),
            &["tabular:iris:Iris.CSV".to_string()]
        );
        let fields = controller.api().sent_fields.borrow();
        assert!(fields.contains(&("target_column".to_string(), "species".to_string())));
    }

    #[test]
    fn test_tabular_rejects_bad_input_before_blocking() {
        let controller = controller();
        let control = FakeControl::default();
        let submit = |dataset: Option<FileUpload>| {
            pollster::block_on(controller.dispatch(
                Command::TrainTabularWithRealData {
                    form: iris_form(),
                    dataset,
                },
                Some(&control),
            ))
            .unwrap_err()
        };

        assert!(matches!(
            submit(None),
            SubmitError::Validation(ValidationError::MissingDataset)
        ));
        assert!(matches!(
            submit(Some(FileUpload::new("iris.json", Vec::new()))),
            SubmitError::Validation(ValidationError::NotTabular { .. })
        ));
        assert!(!control.disabled.get());
        assert!(controller.api().calls.borrow().is_empty());
    }

    #[test]
    fn test_tabular_rejected_while_busy() {
        let controller = controller();
        assert!(controller.guard().start_block(None));

        let err = pollster::block_on(controller.dispatch(
            Command::TrainTabularWithRealData {
                form: iris_form(),
                dataset: None,
            },
            None,
        ))
        .unwrap_err();

        // Busy wins over the missing file.
        assert!(matches!(err, SubmitError::AlreadyBlocked));
        controller.guard().end_block(None);
    }

    #[test]
    fn test_predict_skips_guard() {
        let controller = controller();
        assert!(controller.guard().start_block(None));

        let reply = pollster::block_on(controller.dispatch(
            Command::PredictCnnWithRealData(PredictionRequest {
                model_name: "pets".to_string(),
                image: Some(FileUpload::new("rex.JPG", vec![0xff, 0xd8])),
            }),
            None,
        ))
        .unwrap();

        let Reply::Predicted { response } = reply else {
            panic!("expected a prediction reply");
        };
        assert_eq!(response.prediction.class_name, "dogs");
        assert_eq!(controller.api().busy_during_call.get(), Some(true));
        assert_eq!(
            controller.api().calls.borrow().as_slice(),
            &["predict:pets:rex.JPG".to_string()]
        );
        controller.guard().end_block(None);
    }

    #[test]
    fn test_predict_rejects_non_image() {
        let controller = controller();
        let err = pollster::block_on(controller.dispatch(
            Command::PredictCnnWithRealData(PredictionRequest {
                model_name: "pets".to_string(),
                image: Some(FileUpload::new("notes.txt", Vec::new())),
            }),
            None,
        ))
        .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::NotImage { .. })
        ));
        assert!(controller.api().calls.borrow().is_empty());
    }
}
