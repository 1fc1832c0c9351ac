pub mod compress;
pub mod domain;
pub mod errors;
pub mod extensions;
pub mod models;
pub mod pagination;
pub mod resolver;
pub mod view;

#[cfg(feature = "test-mocks")]
pub mod mock;
#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub use server::run;

#[cfg(feature = "server")]
mod server {
    use actix_files::Files;
    use actix_web::{App, HttpServer, middleware, web};

    use crate::extensions::ExtensionRegistry;
    use crate::extensions::statics::StaticRegistry;
    use crate::models::config::ServerConfig;
    use crate::routes::ViewState;
    use crate::routes::views::show_view;

    /// Builds and runs the Actix-Web HTTP server using the provided configuration.
    pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
        let statics = StaticRegistry::new().property(
            "App",
            "version",
            env!("CARGO_PKG_VERSION"),
        );
        let extensions = ExtensionRegistry::from_config(&server_config.view, statics)
            .map_err(|e| std::io::Error::other(format!("Invalid view extensions: {e}")))?;

        let state = web::Data::new(ViewState {
            config: server_config.view.clone(),
            extensions,
            context_aliases: server_config.context_aliases.clone(),
        });

        let bind_address = (server_config.address.clone(), server_config.port);
        log::info!(
            "Serving views from {} on {}:{}",
            server_config.view.view_root().display(),
            bind_address.0,
            bind_address.1
        );

        let assets_dir = server_config.assets_dir.clone();

        HttpServer::new(move || {
            let mut app = App::new()
                .wrap(middleware::Logger::default())
                .app_data(state.clone());
            if let Some(dir) = &assets_dir {
                app = app.service(Files::new("/assets", dir));
            }
            app.service(show_view)
        })
        .bind(bind_address)?
        .run()
        .await
    }
}
