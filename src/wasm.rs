use std::rc::Rc;

use js_sys::{Promise, Uint8Array};
use serde::de::DeserializeOwned;
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Element, File};

use crate::api::{FetchApi, ModelKind};
use crate::config::AppConfig;
use crate::dom::{DomControl, DomOverlay, DomUnloadHooks};
use crate::form::{FileUpload, PredictionRequest};
use crate::guard::{NavigationGuard, UiControl};
use crate::handlers::{SubmitError, TrainingController};
use crate::logging;
use crate::message::{Alert, Command, Reply};
use crate::session::Session;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_or_default();
    logging::init(config.preferences.log_level.to_level_filter());
    log::info!("{} WASM starting...", config.app_name);
}

/// Serialize a command outcome as `{ ok, alert, reply }`.
fn outcome_json(result: &Result<Reply, SubmitError>) -> String {
    let value = match result {
        Ok(reply) => json!({
            "ok": true,
            "alert": reply.success_alert(),
            "reply": reply,
        }),
        Err(e) => json!({
            "ok": false,
            "alert": e.alert(),
            "reply": null,
        }),
    };
    value.to_string()
}

fn alert_json(alert: Alert) -> String {
    json!({ "ok": false, "alert": alert, "reply": null }).to_string()
}

fn parse_form<T: DeserializeOwned>(form_json: &str) -> Result<T, String> {
    serde_json::from_str(form_json).map_err(|e| {
        log::warn!("Rejected malformed form: {}", e);
        alert_json(Alert::danger(format!("Invalid form data: {}", e)))
    })
}

fn parse_kind(kind: &str) -> Result<ModelKind, String> {
    serde_json::from_value(serde_json::Value::String(kind.to_lowercase()))
        .map_err(|_| alert_json(Alert::danger(format!("Unknown model family '{}'", kind))))
}

async fn read_file(file: &File) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Console entry point for the pages' scripts.
///
/// Every async method resolves to a JSON string `{ ok, alert, reply }`.
#[wasm_bindgen]
pub struct WebConsole {
    controller: Rc<TrainingController<FetchApi>>,
    config: AppConfig,
}

#[wasm_bindgen]
impl WebConsole {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebConsole, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;

        let config = AppConfig::load_or_default();
        let overlay = DomOverlay::attach(&document)?;
        let unload = Rc::new(DomUnloadHooks::new(window));
        let guard = Rc::new(NavigationGuard::new(Box::new(overlay), unload));

        let api = FetchApi::new(config.api.clone(), Session::load_from_local_storage());
        log::info!("Console connected to {}", config.api.base_url);

        Ok(WebConsole {
            controller: Rc::new(TrainingController::new(guard, api)),
            config,
        })
    }

    /// Whether a training request is in flight.
    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.controller.guard().is_busy()
    }

    /// Detect the classes of the archive picked in `file` to pre-fill the form.
    #[wasm_bindgen(js_name = scanArchive)]
    pub fn scan_archive(&self, file: File) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            let archive = FileUpload::new(file.name(), read_file(&file).await?);
            let result = controller.dispatch(Command::ScanArchive(archive), None).await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// Train on the archive picked in `file`, disabling `button` meanwhile.
    #[wasm_bindgen(js_name = trainCnnReal)]
    pub fn train_cnn_real(
        &self,
        form_json: String,
        file: Option<File>,
        button: Option<Element>,
    ) -> Promise {
        let controller = self.controller.clone();
        let config = self.config.clone();

        future_to_promise(async move {
            // Refuse before reading a possibly large file.
            if controller.guard().is_busy() {
                return Ok(JsValue::from_str(&alert_json(
                    SubmitError::AlreadyBlocked.alert(),
                )));
            }

            let form = match parse_form(&form_json) {
                Ok(form) => form,
                Err(json) => return Ok(JsValue::from_str(&json)),
            };

            let archive = match file {
                Some(file) => {
                    let size = file.size() as u64;
                    if config.is_large_archive(size) && !confirm_large_upload(&file.name(), size) {
                        log::info!("Upload of '{}' cancelled by user", file.name());
                        return Ok(JsValue::from_str(&alert_json(Alert::info(
                            "Upload cancelled",
                        ))));
                    }
                    Some(FileUpload::new(file.name(), read_file(&file).await?))
                }
                None => None,
            };

            let control = button.map(DomControl::new);
            let result = controller
                .dispatch(
                    Command::TrainCnnWithRealData { form, archive },
                    control.as_ref().map(|c| c as &dyn UiControl),
                )
                .await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// Train on synthetic data, disabling `button` meanwhile.
    #[wasm_bindgen(js_name = trainCnnTest)]
    pub fn train_cnn_test(&self, form_json: String, button: Option<Element>) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            let form = match parse_form(&form_json) {
                Ok(form) => form,
                Err(json) => return Ok(JsValue::from_str(&json)),
            };

            let control = button.map(DomControl::new);
            let result = controller
                .dispatch(
                    Command::TrainCnnWithTestData(form),
                    control.as_ref().map(|c| c as &dyn UiControl),
                )
                .await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// Train a tabular model on the spreadsheet picked in `file`.
    #[wasm_bindgen(js_name = trainTabularReal)]
    pub fn train_tabular_real(
        &self,
        form_json: String,
        file: Option<File>,
        button: Option<Element>,
    ) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            if controller.guard().is_busy() {
                return Ok(JsValue::from_str(&alert_json(
                    SubmitError::AlreadyBlocked.alert(),
                )));
            }

            let form = match parse_form(&form_json) {
                Ok(form) => form,
                Err(json) => return Ok(JsValue::from_str(&json)),
            };
            let dataset = match file {
                Some(file) => Some(FileUpload::new(file.name(), read_file(&file).await?)),
                None => None,
            };

            let control = button.map(DomControl::new);
            let result = controller
                .dispatch(
                    Command::TrainTabularWithRealData { form, dataset },
                    control.as_ref().map(|c| c as &dyn UiControl),
                )
                .await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// Classify the image picked in `file` with a stored CNN.
    #[wasm_bindgen(js_name = predictCnnReal)]
    pub fn predict_cnn_real(&self, model_name: String, file: Option<File>) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            let image = match file {
                Some(file) => Some(FileUpload::new(file.name(), read_file(&file).await?)),
                None => None,
            };
            let request = PredictionRequest { model_name, image };
            let result = controller
                .dispatch(Command::PredictCnnWithRealData(request), None)
                .await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// List stored models of a family (`"cnn"` or `"tabular"`).
    #[wasm_bindgen(js_name = listModels)]
    pub fn list_models(&self, kind: String) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            let kind = match parse_kind(&kind) {
                Ok(kind) => kind,
                Err(json) => return Ok(JsValue::from_str(&json)),
            };
            let result = controller.dispatch(Command::ListModels(kind), None).await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }

    /// Delete a stored model.
    #[wasm_bindgen(js_name = deleteModel)]
    pub fn delete_model(&self, kind: String, name: String) -> Promise {
        let controller = self.controller.clone();

        future_to_promise(async move {
            let kind = match parse_kind(&kind) {
                Ok(kind) => kind,
                Err(json) => return Ok(JsValue::from_str(&json)),
            };
            let result = controller
                .dispatch(Command::DeleteModel { kind, name }, None)
                .await;
            Ok(JsValue::from_str(&outcome_json(&result)))
        })
    }
}

fn confirm_large_upload(file_name: &str, size: u64) -> bool {
    let Some(window) = web_sys::window() else {
        return true;
    };
    let message = format!(
        "'{}' is {:.1} MB. Uploading may take a while. Continue?",
        file_name,
        size as f64 / (1024.0 * 1024.0)
    );
    window.confirm_with_message(&message).unwrap_or(false)
}
