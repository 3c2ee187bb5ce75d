//! Typed API calls.

use uuid::Uuid;

use crate::client::{ApiClient, ApiRequest, FormPart, LOGIN, LOGOUT, REGISTER};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AuthResponse, ChangePasswordRequest, CreateUserResponse, ListUsersQuery, LoginRequest,
    MeResponse, MessageResponse, RegisterRequest, User, UserForm, UserList,
};

fn form_parts(form: &UserForm) -> Vec<FormPart> {
    let mut parts = Vec::new();
    let mut text = |name: &str, value: String| {
        parts.push(FormPart::Text {
            name: name.to_string(),
            value,
        })
    };
    if let Some(name) = &form.name {
        text("name", name.clone());
    }
    if let Some(email) = &form.email {
        text("email", email.clone());
    }
    if let Some(mobile) = &form.mobile {
        text("mobile", mobile.clone());
    }
    if let Some(role) = form.role {
        text("role", role.as_str().to_string());
    }
    if let Some(blocked) = form.is_blocked {
        text("isBlocked", blocked.to_string());
    }
    if let Some(image) = &form.image {
        parts.push(FormPart::File {
            name: "profileImage".into(),
            file: image.clone(),
        });
    }
    parts
}

impl ApiClient {
    /// Create an account; on success the client is signed in as it.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<User> {
        let auth: AuthResponse = self
            .send_json(&ApiRequest::post(REGISTER).json(request)?)
            .await?;
        self.begin_session(auth.user_data.clone(), auth.access_token);
        Ok(auth.user_data)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self
            .send_json(&ApiRequest::post(LOGIN).json(&body)?)
            .await?;
        self.begin_session(auth.user_data.clone(), auth.access_token);
        Ok(auth.user_data)
    }

    /// Sign out. The local session is dropped even if the server call fails.
    pub async fn logout(&self) -> ClientResult<String> {
        let result = self
            .send_json::<MessageResponse>(&ApiRequest::post(LOGOUT))
            .await;
        self.end_session();
        Ok(result?.message)
    }

    /// `GET /user/me`; also refreshes the cached user.
    pub async fn me(&self) -> ClientResult<User> {
        let me: MeResponse = self.send_json(&ApiRequest::get("/user/me")).await?;
        self.session().set_user(me.auth_user.clone());
        Ok(me.auth_user)
    }

    pub async fn get_profile(&self) -> ClientResult<User> {
        self.send_json(&ApiRequest::get("/user/profile")).await
    }

    pub async fn update_profile(&self, form: &UserForm) -> ClientResult<User> {
        let user: User = self
            .send_json(&ApiRequest::put("/user/profile").multipart(form_parts(form)))
            .await?;
        self.session().set_user(user.clone());
        Ok(user)
    }

    pub async fn change_password(&self, current: &str, new: &str) -> ClientResult<String> {
        let body = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        let resp: MessageResponse = self
            .send_json(&ApiRequest::put("/user/password").json(&body)?)
            .await?;
        Ok(resp.message)
    }

    pub async fn list_users(&self, query: &ListUsersQuery) -> ClientResult<UserList> {
        let mut pairs = Vec::new();
        if let Some(search) = &query.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        if let Some(page) = query.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = query.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        self.send_json(&ApiRequest::get("/admin/users").query(pairs))
            .await
    }

    pub async fn create_user(&self, form: &UserForm) -> ClientResult<CreateUserResponse> {
        if form.name.is_none() || form.email.is_none() || form.mobile.is_none() {
            return Err(ClientError::Api {
                status: reqwest::StatusCode::BAD_REQUEST,
                message: "Name, email and mobile are required".into(),
            });
        }
        self.send_json(&ApiRequest::post("/admin/create-user").multipart(form_parts(form)))
            .await
    }

    pub async fn update_user(&self, id: Uuid, form: &UserForm) -> ClientResult<String> {
        let resp: MessageResponse = self
            .send_json(
                &ApiRequest::put(format!("/admin/update-user/{id}")).multipart(form_parts(form)),
            )
            .await?;
        Ok(resp.message)
    }

    /// Permanent delete.
    pub async fn delete_user(&self, id: Uuid) -> ClientResult<String> {
        let resp: MessageResponse = self
            .send_json(&ApiRequest::delete(format!("/admin/delete-user/{id}")))
            .await?;
        Ok(resp.message)
    }

    pub async fn soft_delete_user(&self, id: Uuid) -> ClientResult<String> {
        let resp: MessageResponse = self
            .send_json(&ApiRequest::delete(format!("/admin/soft-delete-user/{id}")))
            .await?;
        Ok(resp.message)
    }
}
