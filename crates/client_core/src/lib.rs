//! Client library for the remote admin REST API: login/session handling,
//! the multi-step registration wizard, and paginated user/product listings.
//!
//! There is no ambient token storage. `AdminApi::login` produces a
//! [`Session`] and every authorized call takes it explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::{Role, UserId},
    error::ApiErrorBody,
    protocol::{LoginRequest, LoginResponse, PagedResponse, PageQuery, ProductRecord, UserRecord},
};
use tracing::{debug, info};
use url::Url;

pub mod error;
pub mod pager;
pub mod wizard;

pub use error::ApiClientError;

use pager::PageSource;
use wizard::{validate_draft, PhotoUpload, RegistrationDraft, RegistrationGateway, ValidationError};

const LOGIN_FALLBACK: &str = "Invalid email or password. Please try again.";
const USER_LIST_FALLBACK: &str = "Failed to fetch users. Please try again later.";
const USER_DELETE_FALLBACK: &str = "Failed to delete user. Please try again.";
const REGISTER_FALLBACK: &str = "Failed to add user. Please check your input.";
const PRODUCT_LIST_FALLBACK: &str = "Failed to fetch products. Please try again later.";
const ADD_PRODUCT_FALLBACK: &str = "Failed to add product. Please try again.";

/// Bearer credential and role obtained at login. Created once per login and
/// injected into every authorized call; nothing in this crate reads a token
/// from ambient state.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub role: Role,
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// A product submission for the sales view: plain fields plus one image,
/// sent as a single multipart POST.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: PhotoUpload,
}

/// HTTP client bound to one API base URL.
pub struct AdminApi {
    http: Client,
    base_url: String,
}

impl AdminApi {
    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ApiClientError::Format(format!("invalid base url '{base_url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiClientError::Format(format!(
                "base url must start with http:// or https://, got '{base_url}'"
            )));
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Page source for the user list, including its delete endpoint.
    pub fn users(self: &Arc<Self>) -> UserListSource {
        UserListSource {
            api: Arc::clone(self),
        }
    }

    /// Page source for the product list. The API exposes no product delete.
    pub fn products(self: &Arc<Self>) -> ProductListSource {
        ProductListSource {
            api: Arc::clone(self),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiClientError> {
        debug!(email, "logging in");
        let response = self
            .http
            .post(self.endpoint("login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(ApiClientError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response, LOGIN_FALLBACK).await);
        }

        let body: LoginResponse = response.json().await.map_err(ApiClientError::from)?;
        if !body.success {
            return Err(ApiClientError::Api {
                status,
                message: body.message.unwrap_or_else(|| LOGIN_FALLBACK.to_string()),
            });
        }

        let token = body
            .token
            .ok_or_else(|| ApiClientError::Format("login response missing token".to_string()))?;
        let role = body
            .role
            .ok_or_else(|| ApiClientError::Format("login response missing role".to_string()))?;
        info!(?role, "login succeeded");
        Ok(Session::new(token, role))
    }

    pub async fn list_users(
        &self,
        session: &Session,
        query: PageQuery,
    ) -> Result<PagedResponse<UserRecord>, ApiClientError> {
        debug!(page = query.page, per_page = query.per_page, "fetching user list");
        let response = self
            .http
            .get(self.endpoint("user-list"))
            .bearer_auth(session.token())
            .query(&query)
            .send()
            .await
            .map_err(ApiClientError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response, USER_LIST_FALLBACK).await);
        }
        response.json().await.map_err(ApiClientError::from)
    }

    pub async fn delete_user(&self, session: &Session, id: UserId) -> Result<(), ApiClientError> {
        debug!(user_id = id.0, "deleting user");
        let response = self
            .http
            .post(self.endpoint(&format!("user-delete/{id}")))
            .bearer_auth(session.token())
            .send()
            .await
            .map_err(ApiClientError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response, USER_DELETE_FALLBACK).await);
        }
        Ok(())
    }

    pub async fn list_products(
        &self,
        session: &Session,
        query: PageQuery,
    ) -> Result<PagedResponse<ProductRecord>, ApiClientError> {
        debug!(page = query.page, per_page = query.per_page, "fetching product list");
        let response = self
            .http
            .get(self.endpoint("product-list"))
            .bearer_auth(session.token())
            .query(&query)
            .send()
            .await
            .map_err(ApiClientError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response, PRODUCT_LIST_FALLBACK).await);
        }
        response.json().await.map_err(ApiClientError::from)
    }

    pub async fn add_product(
        &self,
        session: &Session,
        product: &NewProduct,
    ) -> Result<(), ApiClientError> {
        debug!(name = %product.name, "adding product");
        let form = product_form(product)?;
        let response = self
            .http
            .post(self.endpoint("add-product"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await
            .map_err(ApiClientError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response, ADD_PRODUCT_FALLBACK).await);
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationGateway for AdminApi {
    async fn register(
        &self,
        session: &Session,
        draft: &RegistrationDraft,
    ) -> Result<(), ApiClientError> {
        let form = registration_form(draft)?;
        debug!(name = %draft.name, email = %draft.email, "submitting registration");
        let response = self
            .http
            .post(self.endpoint("register"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await
            .map_err(ApiClientError::from)?;
        if !response.status().is_success() {
            return Err(api_error(response, REGISTER_FALLBACK).await);
        }
        Ok(())
    }
}

/// Builds the multipart register payload: scalars by wire name, skills
/// joined with a single comma, `confirmPassword` renamed to
/// `password_confirmation`, photo as the binary part.
fn registration_form(draft: &RegistrationDraft) -> Result<Form, ApiClientError> {
    validate_draft(draft)?;
    let photo = draft
        .photo
        .clone()
        .ok_or(ValidationError::PhotoRequired)?;
    let gender = draft
        .gender
        .map(|gender| gender.as_str().to_string())
        .unwrap_or_default();
    Ok(Form::new()
        .text("name", draft.name.clone())
        .text("email", draft.email.clone())
        .text("password", draft.password.clone())
        .text("password_confirmation", draft.confirm_password.clone())
        .text("phoneNumber", draft.phone_number.clone())
        .text("gender", gender)
        .text("countryId", draft.country.clone())
        .text("stateId", draft.state.clone())
        .text("skills", draft.skills_field())
        .part("photo", photo_part(photo)?))
}

fn product_form(product: &NewProduct) -> Result<Form, ApiClientError> {
    if !product.image.is_valid() {
        return Err(ValidationError::PhotoRequired.into());
    }
    Ok(Form::new()
        .text("name", product.name.clone())
        .text("description", product.description.clone())
        .text("price", product.price.clone())
        .part("image", photo_part(product.image.clone())?))
}

fn photo_part(photo: PhotoUpload) -> Result<Part, ApiClientError> {
    let mut part = Part::bytes(photo.bytes).file_name(photo.filename);
    if let Some(mime) = photo.mime_type {
        part = part
            .mime_str(&mime)
            .map_err(|_| ApiClientError::Format(format!("invalid photo mime type: {mime}")))?;
    }
    Ok(part)
}

async fn api_error(response: Response, fallback: &str) -> ApiClientError {
    let status = response.status();
    let message = response
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| fallback.to_string());
    ApiClientError::Api { status, message }
}

/// User listing plus its delete endpoint, driven by a `PagedListController`.
pub struct UserListSource {
    api: Arc<AdminApi>,
}

#[async_trait]
impl PageSource for UserListSource {
    type Row = UserRecord;

    fn list_name(&self) -> &'static str {
        "user"
    }

    async fn fetch_page(
        &self,
        session: &Session,
        query: PageQuery,
    ) -> Result<PagedResponse<UserRecord>, ApiClientError> {
        self.api.list_users(session, query).await
    }

    async fn delete_row(&self, session: &Session, id: i64) -> Result<(), ApiClientError> {
        self.api.delete_user(session, UserId(id)).await
    }
}

pub struct ProductListSource {
    api: Arc<AdminApi>,
}

#[async_trait]
impl PageSource for ProductListSource {
    type Row = ProductRecord;

    fn list_name(&self) -> &'static str {
        "product"
    }

    async fn fetch_page(
        &self,
        session: &Session,
        query: PageQuery,
    ) -> Result<PagedResponse<ProductRecord>, ApiClientError> {
        self.api.list_products(session, query).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
