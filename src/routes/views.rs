use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, get, web};
use log::{error, warn};
use tera::Context;

use crate::compress::Minifier;
use crate::errors::ViewError;
use crate::routes::{ViewState, parse_route};
use crate::view::View;

#[get("/{path:.*}")]
pub async fn show_view(
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<ViewState>,
) -> impl Responder {
    let Some(target) = parse_route(&path, &state.context_aliases) else {
        warn!("Rejected view path `{}`", path.as_str());
        return HttpResponse::NotFound().finish();
    };

    let mut params = Context::new();
    params.insert("query", &query.into_inner());
    params.insert("action", target.controller.action_name.as_str());

    let mut view = View::new(&state.config, &target.controller, &state.extensions);
    if let Some(view_file) = &target.view_file {
        view.set_view_file(view_file.as_str());
    }
    view.set_view_params(params);

    match view.output(target.content_type, &Minifier) {
        Ok(body) => HttpResponse::Ok()
            .content_type(target.content_type)
            .body(body),
        Err(ViewError::TemplateNotFound { searched }) => {
            error!(
                "No view for `{}` ({} candidates searched)",
                path.as_str(),
                searched.len()
            );
            HttpResponse::NotFound().finish()
        }
        Err(err) => {
            error!("Failed to render `{}`: {err}", path.as_str());
            HttpResponse::InternalServerError().finish()
        }
    }
}
