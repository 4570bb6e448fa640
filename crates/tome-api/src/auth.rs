use std::sync::Arc;

use tome_engine::Engine;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Engine,
    /// HS256 secret shared with the identity provider that issues tokens.
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(engine: Engine, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            engine,
            jwt_secret: jwt_secret.into(),
        })
    }
}
