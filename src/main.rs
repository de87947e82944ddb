use clap::{Parser, Subcommand};
use grafe::config::{self, SiteConfig};
use grafe::output;
use grafe::pipeline::{self, Project};
use grafe::scripts::CommandTranspiler;
use grafe::serve::PreviewServer;
use std::path::PathBuf;

/// Overrides for the preview server address.
#[derive(clap::Args, Clone, Default)]
struct ServeArgs {
    /// Interface to bind (overrides serve.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides serve.port)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Parser)]
#[command(name = "grafe")]
#[command(about = "Static site generator: markdown, templates and assets into public/")]
#[command(long_about = "\
Static site generator: markdown, templates and assets into public/

Project structure:

  grafe.toml                      # Optional settings (see 'grafe gen-config')
  content/                        # .md files are rendered, everything else copied
  │   ├── index.md                # → public/index.html
  │   └── posts/hello.md          # → public/posts/hello.html
  theme/
  ├── templates/
  │   ├── layouts/default.html    # Selected by front matter 'Template: default'
  │   └── includes/head.html      # Available to every layout
  └── static/                     # Theme assets → public/
  static/                         # Project assets → public/ (override theme)

Front matter:
  Title, Summary, Template        required strings
  Draft                           optional bool; true skips the page
  Params                          optional mapping, exposed as PageParams

Without a command, grafe builds the site and serves public/ for preview.")]
#[command(version)]
struct Cli {
    /// Project root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site, then serve public/ for preview (default)
    Serve(ServeArgs),
    /// Build the site into public/
    Build,
    /// Validate front matter and templates without writing anything
    Check,
    /// Print a stock grafe.toml with all options documented
    GenConfig,
}

fn build(project: &Project, config: &SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    let transpiler = CommandTranspiler::from_config(&config.scripts);
    let report = pipeline::build_site(project, config, &transpiler)?;
    output::print_build_output(&report, &project.root);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let project = Project::new(&cli.root);

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            let mut config = config::load_config(&project.root)?;
            if let Some(host) = args.host {
                config.serve.host = host;
            }
            if let Some(port) = args.port {
                config.serve.port = port;
            }
            config.validate()?;
            build(&project, &config)?;
            let server = PreviewServer::bind(&config.serve, &project.output_dir)?;
            server.run();
        }
        Command::Build => {
            let config = config::load_config(&project.root)?;
            build(&project, &config)?;
        }
        Command::Check => {
            let report = pipeline::check_site(&project)?;
            output::print_check_output(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
