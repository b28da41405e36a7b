use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rhtmx_navigator::route::{guard, CompiledRoute, RouteDefinition};
use rhtmx_navigator::{
    MemoryHistory, NavigateOptions, Navigator, NavigatorConfig, OutletContent, OutletView,
    NavigationError,
};

#[derive(Parser)]
#[command(name = "rhtmx-nav")]
#[command(version, about = "RHTMX Navigator - replay URLs through the navigation engine", long_about = None)]
struct Cli {
    /// Navigator configuration file (TOML)
    #[arg(short, long, default_value = "navigator.toml")]
    config: PathBuf,

    /// Override the configured base href
    #[arg(short, long)]
    base_href: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled demo route tree in priority order
    Routes,

    /// Navigate through each URL in turn and print outlet renders
    Replay {
        /// App-local URLs, e.g. /users/42?tab=posts
        #[arg(required = true)]
        urls: Vec<String>,

        /// Replace the history entry instead of pushing
        #[arg(long)]
        replace: bool,

        /// Go back this many entries after replaying
        #[arg(long, default_value = "0")]
        back: usize,
    },
}

/// Outlet printing whatever it is asked to render
struct PrintOutlet {
    depth: usize,
    navigator: Navigator,
}

impl OutletView for PrintOutlet {
    fn render(&self, content: Option<&OutletContent>) {
        let indent = "  ".repeat(self.depth - 1);
        let Some(content) = content else {
            println!("{}[{}] <empty>", indent, self.depth);
            return;
        };

        let component = content
            .component
            .as_ref()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "<outlet>".to_string());
        println!(
            "{}[{}] {} {} params={:?} resolves={}",
            indent,
            self.depth,
            component,
            content.route.pattern(),
            content.params.snapshot(),
            json!(content.resolves)
        );

        // Mount the nested outlet the rendered view would contain
        if content.route.children().is_empty() {
            self.navigator.deregister_view(self.depth + 1);
        } else if self.navigator.outlet_count() == self.depth {
            let child = Arc::new(PrintOutlet {
                depth: self.depth + 1,
                navigator: self.navigator.clone(),
            });
            if let Err(err) = self.navigator.register_view(child, self.depth + 1) {
                eprintln!("{}", err);
            }
        }
    }

    fn destroy(&self) {
        println!("{}[{}] destroyed", "  ".repeat(self.depth - 1), self.depth);
    }

    fn render_error(&self, error: &NavigationError) -> bool {
        println!("{}[{}] error: {}", "  ".repeat(self.depth - 1), self.depth, error);
        true
    }
}

fn demo_routes() -> Vec<RouteDefinition> {
    vec![
        RouteDefinition::route("/", "Home").with_name("home"),
        RouteDefinition::nest(
            "/users",
            vec![
                RouteDefinition::index("UserList"),
                RouteDefinition::nest(
                    "/:id<num>",
                    vec![
                        RouteDefinition::index("UserOverview"),
                        RouteDefinition::route("/posts", "UserPosts").with_name("user.posts"),
                    ],
                )
                .with_component("UserLayout")
                .with_name("user")
                .with_resolver("user", |ctx| async move {
                    Ok(json!({ "id": ctx.params.get("id").and_then(|v| v.as_num()) }))
                }),
            ],
        )
        .with_component("UsersLayout"),
        RouteDefinition::nest(
            "/admin",
            vec![RouteDefinition::route("/settings", "AdminSettings")],
        )
        .with_redirect_child("settings")
        .on_enter(guard(|_from, to| async move { to.query.contains_key("token") })),
        RouteDefinition::redirect("/people/:id", "/users/:id"),
        RouteDefinition::route("/docs/*", "Docs"),
        RouteDefinition::route("/*", "NotFound"),
    ]
}

fn print_routes(routes: &[Arc<CompiledRoute>], depth: usize) {
    for route in routes {
        println!(
            "{}{:<24} {:?}{}",
            "  ".repeat(depth),
            route.pattern(),
            route.kind(),
            route.name().map(|n| format!(" ({})", n)).unwrap_or_default()
        );
        print_routes(route.children(), depth + 1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = NavigatorConfig::from_file(&cli.config)?;
    if let Some(base_href) = cli.base_href {
        config = config.with_base_href(base_href);
    }

    let history = Arc::new(MemoryHistory::new(config.base_href.clone()));
    let navigator = Navigator::new(demo_routes(), history.clone(), config)
        .context("Failed to compile demo routes")?;

    match cli.command {
        Commands::Routes => print_routes(navigator.routes().routes(), 0),
        Commands::Replay { urls, replace, back } => {
            let root = Arc::new(PrintOutlet {
                depth: 1,
                navigator: navigator.clone(),
            });
            navigator.register_view(root, 1)?;

            let options = NavigateOptions { replace };
            for url in &urls {
                println!("--> {}", url);
                let outcome = navigator.navigate(url, options).await?;
                info!(url = %url, outcome = ?outcome, "navigation finished");
            }

            for _ in 0..back {
                if !history.back() {
                    break;
                }
                println!("<-- back");
                let outcome = navigator.sync_from_history().await?;
                info!(outcome = ?outcome, location = %navigator.location().href(), "navigation finished");
            }
        }
    }

    Ok(())
}
