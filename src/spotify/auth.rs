use reqwest::{Url, header::AUTHORIZATION};

use crate::{
    Error, Result,
    spotify::{SpotifyClient, check_status},
    types::TokenResponse,
    utils,
};

impl SpotifyClient {
    /// Builds the URL the owner visits to grant access.
    ///
    /// # Arguments
    ///
    /// * `state` - Random value echoed back on the redirect, checked by the
    ///   caller to tie the callback to this request
    /// * `scope` - Space separated list of permissions
    /// * `redirect_uri` - Must match a redirect URI registered for the app
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured authorize URL is not a
    /// valid URL.
    pub fn authorize_url(&self, state: &str, scope: &str, redirect_uri: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("scope", scope),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid authorize URL '{}': {e}", self.auth_url)))?;

        Ok(url.to_string())
    }

    /// Exchanges an authorization code for an access and refresh token.
    ///
    /// Uses the confidential-client flow: the client credentials travel in a
    /// Basic `Authorization` header and the code in a form body. The
    /// `redirect_uri` must be the one used to build the authorize URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on network failures or an undecodable body
    /// - [`Error::Upstream`] if Spotify rejects the code, carrying its body
    /// - [`Error::Auth`] if the response does not include a refresh token
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let token = self
            .request_token(&[
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        if token.refresh_token.is_none() {
            return Err(Error::Auth(
                "Token response did not include a refresh token".to_string(),
            ));
        }

        Ok(token)
    }

    /// Mints a new access token from the stored refresh token.
    ///
    /// Spotify may or may not rotate the refresh token; when it does, the new
    /// one is in [`TokenResponse::refresh_token`].
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .header(
                AUTHORIZATION,
                utils::basic_auth_value(&self.client_id, &self.client_secret),
            )
            .form(form)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<TokenResponse>().await?)
    }
}
