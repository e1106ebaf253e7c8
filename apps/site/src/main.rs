use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pipeline::{build_site, page_index, sitemap, BuildContext};
use search::LiveFilter;

#[derive(Parser, Debug)]
#[command(name = "site", about = "Static site builder with a live-reload dev server")]
struct Cli {
    /// Site root containing site.toml, src/ and assets/
    #[arg(long, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build CSS, pages, assets and site metadata into public/
    Build,
    /// Build, then serve public/ with file watching and live reload
    Serve {
        /// Override the port from site.toml's dev_bind
        #[arg(long)]
        port: Option<u16>,
    },
    /// Regenerate sitemap.xml and robots.txt only
    Assets,
    /// Filter page titles the way the in-page search box does
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            let ctx = BuildContext::load(cli.root)?;
            let report = build_site(&ctx)?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!("rendered {} page(s)", report.rendered.len());
            if report.sitemap_written {
                println!("sitemap.xml written");
            }
            if report.robots_written {
                println!("robots.txt written");
            }
        }
        Command::Serve { port } => {
            devserver::run(cli.root, port).await?;
        }
        Command::Assets => {
            let ctx = BuildContext::load(cli.root)?;
            if !ctx.settings.generate_sitemap && !ctx.settings.generate_robots {
                println!("sitemap and robots generation are disabled in site.toml");
            }
            if ctx.settings.generate_sitemap {
                let path = sitemap::create_sitemap(&ctx)?;
                println!("sitemap written to {}", path.display());
            }
            if ctx.settings.generate_robots {
                let path = sitemap::create_robots(&ctx)?;
                println!("robots.txt written to {}", path.display());
            }
        }
        Command::Search { query } => {
            let ctx = BuildContext::load(cli.root)?;
            let pages = page_index(&ctx)?;
            let mut filter = LiveFilter::new(pages.iter().map(|page| page.title.clone()));
            filter.apply(&query);

            let visible: Vec<_> = pages
                .iter()
                .zip(filter.items())
                .filter(|(_, item)| item.is_visible())
                .map(|(page, _)| page)
                .collect();
            if visible.is_empty() {
                println!("no pages match '{query}'");
            } else {
                for page in visible {
                    println!("{}\t{}", page.path, page.title);
                }
            }
        }
    }

    Ok(())
}
