/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - Bearer が必要な範囲は app.rs 側で middleware を適用する
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::me::me;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
