use server_api::ApiContext;

use crate::auth::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiContext,
    pub jwt: JwtConfig,
}
