use axum::body::to_bytes;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::format_number;

/// Upload bodies can be large; responses of the import API are small JSON
const MAX_LOGGED_BODY: usize = 64 * 1024 * 1024;

/// Middleware для логирования HTTP запросов: длительность, размер ответа, статус, метод, путь
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                target: "http",
                "{} {} -> {} | {}ms | body error: {}",
                method,
                path,
                parts.status.as_u16(),
                start.elapsed().as_millis(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let status = parts.status.as_u16();
    let elapsed = start.elapsed().as_millis();
    if parts.status.is_server_error() {
        tracing::error!(target: "http", "{} {} -> {} | {}ms | {} B", method, path, status, elapsed, format_number(bytes.len()));
    } else {
        tracing::info!(target: "http", "{} {} -> {} | {}ms | {} B", method, path, status, elapsed, format_number(bytes.len()));
    }

    Response::from_parts(parts, Body::from(bytes))
}
