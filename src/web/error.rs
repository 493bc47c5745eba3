//! Rendered error pages.

use crate::middleware::ClientCtx;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{HeaderValue, CONTENT_TYPE};
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpMessage, Result};
use askama_actix::Template;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub client: ClientCtx,
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res, "Bad Request")
}

pub fn render_401<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res, "Login Required")
}

pub fn render_403<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res, "Forbidden")
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res, "Not Found")
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    render(res, "Internal Server Error")
}

fn render<B>(res: ServiceResponse<B>, title: &'static str) -> Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    // Handler errors carry a short public message; keep it.
    let message = res
        .response()
        .error()
        .map(|e| e.to_string())
        .unwrap_or_default();

    let (req, res) = res.into_parts();
    let client = ClientCtx::get_or_default_from_extensions(&mut req.extensions_mut());

    let body = match (ErrorTemplate {
        client,
        status: status.as_u16(),
        title,
        message,
    })
    .render()
    {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to render error page: {}", e);
            title.to_owned()
        }
    };

    let mut res = ServiceResponse::new(req, res.set_body(body))
        .map_into_boxed_body()
        .map_into_right_body();
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Ok(ErrorHandlerResponse::Response(res))
}
