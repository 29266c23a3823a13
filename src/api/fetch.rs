//! `fetch`-based [`ModelApi`] for the browser build.

use std::cell::RefCell;

use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, FormData, Headers, Request, RequestInit, Response};

use super::{
    AUTH_REFRESH_ENDPOINT, ApiError, CNN_PREDICT_REAL_ENDPOINT, CNN_TRAIN_REAL_ENDPOINT,
    CNN_TRAIN_TEST_ENDPOINT, DeleteResponse, ModelApi, ModelKind, ModelListResponse,
    PredictionResponse, RefreshResponse, TABULAR_TRAIN_REAL_ENDPOINT, TabularTrainResponse,
    TrainResponse, UPLOAD_FIELD, parse_response,
};
use crate::config::ApiSettings;
use crate::form::{CnnTrainingForm, FileUpload, TabularTrainingForm, TestTrainingRequest};
use crate::session::Session;

fn js_error(e: JsValue) -> ApiError {
    ApiError::Network(
        e.as_string()
            .or_else(|| {
                e.dyn_ref::<js_sys::Error>()
                    .map(|err| String::from(err.message()))
            })
            .unwrap_or_else(|| format!("{:?}", e)),
    )
}

/// Body of one request, reusable for a retry.
enum Body {
    Empty,
    Json(JsValue),
    Multipart(JsValue),
}

impl Body {
    fn multipart(fields: Vec<(String, String)>, upload: &FileUpload) -> Result<Self, ApiError> {
        let data = FormData::new().map_err(js_error)?;
        for (name, value) in fields {
            data.append_with_str(&name, &value).map_err(js_error)?;
        }

        let bytes = js_sys::Uint8Array::from(upload.data.as_slice());
        let blob = Blob::new_with_u8_array_sequence(&js_sys::Array::of1(&bytes))
            .map_err(js_error)?;
        data.append_with_blob_and_filename(UPLOAD_FIELD, &blob, &upload.file_name)
            .map_err(js_error)?;

        Ok(Body::Multipart(data.into()))
    }
}

/// Calls the backend with `window.fetch`, attaching the session's bearer token.
///
/// A request rejected for its token is retried once after a refresh.
pub struct FetchApi {
    settings: ApiSettings,
    session: RefCell<Session>,
}

impl FetchApi {
    pub fn new(settings: ApiSettings, session: Session) -> Self {
        match session.user() {
            Some(user) if session.is_authenticated() => {
                log::info!("Signed in as {}", user.username)
            }
            _ if session.is_authenticated() => log::info!("Signed in"),
            _ => log::warn!("No access token found, API requests will be unauthenticated"),
        }
        Self {
            settings,
            session: RefCell::new(session),
        }
    }

    async fn fetch(
        &self,
        method: &str,
        path: &str,
        bearer: Option<String>,
        body: &Body,
    ) -> Result<(u16, String), ApiError> {
        let url = self.settings.url(path);

        let headers = Headers::new().map_err(js_error)?;
        if let Some(bearer) = bearer {
            headers.set("Authorization", &bearer).map_err(js_error)?;
        }

        let init = RequestInit::new();
        init.set_method(method);
        match body {
            Body::Empty => {}
            Body::Json(json) => {
                headers
                    .set("Content-Type", "application/json")
                    .map_err(js_error)?;
                init.set_body(json);
            }
            // The browser sets the multipart boundary itself.
            Body::Multipart(data) => init.set_body(data),
        }
        init.set_headers(&headers);

        let request = Request::new_with_str_and_init(&url, &init).map_err(js_error)?;
        let window =
            web_sys::window().ok_or_else(|| ApiError::Network("No window".to_string()))?;

        log::debug!("{} {}", method, url);
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;

        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?
            .as_string()
            .unwrap_or_default();

        Ok((response.status(), text))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Body,
    ) -> Result<T, ApiError> {
        let bearer = self.session.borrow().bearer();
        let (status, text) = self.fetch(method, path, bearer, &body).await?;

        let result = match parse_response(status, &text) {
            Err(e) if e.is_token_rejection() && self.refresh().await => {
                log::info!("Retrying {} {} with a refreshed token", method, path);
                let bearer = self.session.borrow().bearer();
                let (status, text) = self.fetch(method, path, bearer, &body).await?;
                parse_response(status, &text)
            }
            result => result,
        };

        if let Err(e) = &result {
            log::warn!("{} {} failed (status {:?}): {}", method, path, e.status(), e);
        }
        result
    }

    /// Ask for a new access token. Returns whether the session was updated.
    async fn refresh(&self) -> bool {
        let Some(bearer) = self.session.borrow().refresh_bearer() else {
            return false;
        };

        let result = match self
            .fetch("POST", AUTH_REFRESH_ENDPOINT, Some(bearer), &Body::Empty)
            .await
        {
            Ok((status, text)) => parse_response::<RefreshResponse>(status, &text),
            Err(e) => Err(e),
        };

        match result {
            Ok(refreshed) => {
                let mut session = self.session.borrow_mut();
                session.set_access_token(refreshed.access_token);
                session.store_access_token();
                log::info!("Access token refreshed");
                true
            }
            Err(e) => {
                log::warn!("Token refresh failed: {}", e);
                false
            }
        }
    }
}

impl ModelApi for FetchApi {
    fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    async fn train_cnn_test(&self, request: &TestTrainingRequest) -> Result<TrainResponse, ApiError> {
        let json = JsValue::from_str(&serde_json::to_string(request)?);
        self.send("POST", CNN_TRAIN_TEST_ENDPOINT, Body::Json(json))
            .await
    }

    async fn train_cnn_real(
        &self,
        form: &CnnTrainingForm,
        archive: &FileUpload,
    ) -> Result<TrainResponse, ApiError> {
        let body = Body::multipart(form.to_multipart_fields(), archive)?;
        self.send("POST", CNN_TRAIN_REAL_ENDPOINT, body).await
    }

    async fn train_tabular_real(
        &self,
        form: &TabularTrainingForm,
        dataset: &FileUpload,
    ) -> Result<TabularTrainResponse, ApiError> {
        let body = Body::multipart(form.to_multipart_fields(), dataset)?;
        self.send("POST", TABULAR_TRAIN_REAL_ENDPOINT, body).await
    }

    async fn predict_cnn_real(
        &self,
        model_name: &str,
        image: &FileUpload,
    ) -> Result<PredictionResponse, ApiError> {
        let fields = vec![("model_name".to_string(), model_name.trim().to_string())];
        let body = Body::multipart(fields, image)?;
        self.send("POST", CNN_PREDICT_REAL_ENDPOINT, body).await
    }

    async fn list_models(&self, kind: ModelKind) -> Result<ModelListResponse, ApiError> {
        self.send("GET", kind.models_endpoint(), Body::Empty).await
    }

    async fn delete_model(&self, kind: ModelKind, name: &str) -> Result<DeleteResponse, ApiError> {
        let encoded = String::from(js_sys::encode_uri_component(name));
        self.send("DELETE", &kind.model_endpoint(&encoded), Body::Empty)
            .await
    }
}
