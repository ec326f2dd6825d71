use clap::{Parser, Subcommand};
use plainpress::pipeline::{self, Project};
use plainpress::render::Renderer;
use plainpress::{config, output, serve};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plainpress")]
#[command(about = "Static site generator for Markdown notes and blogs")]
#[command(long_about = "\
Static site generator for Markdown notes and blogs

Your filesystem is the data source. Every Markdown file becomes a page at a
URL mirroring its path; files below the posts directory become dated posts
with tag pages; templates decide how everything looks.

Project structure:

  site.toml                        # Configuration (required)
  content/
  ├── _index.md                    # Home page (home.html)
  ├── about.md                     # Page → /about/ (page.html, in nav)
  ├── _ideas.md                    # Underscore prefix = draft, never built
  ├── .obsidian/                   # Dot prefix = ignored entirely
  └── blog/
      ├── _index.md                # Section index → /blog/ (list.html)
      ├── hello-world.md           # Post → /blog/hello-world/ (post.html)
      └── diagram.png              # Asset, copied next to the post
  templates/                       # home, list, post, page, optional 404
  static/                          # Copied to the output root
  public/                          # Output

Headers are YAML between --- fences or TOML between +++ fences:
  title, date (YYYY-MM-DD), slug, tags, layout, weight

Math between $…$ or $$…$$ passes through untouched; ![alt|300](img.png)
sets the image width.

Run 'plainpress gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Configuration file, relative to the project root
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build,
    /// Build, serve, and rebuild on every change
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Interface to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Validate content and templates without writing anything
    Check,
    /// Dump the content model as JSON
    Scan {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("plainpress=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build => {
            let project = Project::load(&cli.root, cli.config.as_deref())?;
            println!("==> Building {}", project.paths.content.display());
            let (model, report) = pipeline::build_site(&project)?;
            output::print_build_output(&model, &report);
        }
        Command::Serve {
            port,
            host,
            no_open,
        } => {
            let project = Project::load(&cli.root, cli.config.as_deref())?;
            let mut options = project.config.server.clone();
            if let Some(port) = port {
                options.port = port;
            }
            if let Some(host) = host {
                options.host = host;
            }
            if no_open {
                options.open_browser = false;
            }
            serve::serve(project, &options)?;
        }
        Command::Check => {
            let project = Project::load(&cli.root, cli.config.as_deref())?;
            println!("==> Checking {}", project.paths.content.display());
            let (model, _) = pipeline::load_model(&project)?;
            Renderer::new(&project.paths.templates, &model, &project.config, 0)?;
            output::print_check_output(&model);
            println!("==> Content is valid");
        }
        Command::Scan { out } => {
            let project = Project::load(&cli.root, cli.config.as_deref())?;
            let (model, _) = pipeline::load_model(&project)?;
            let json = serde_json::to_string_pretty(&model)?;
            match out {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
