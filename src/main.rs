use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;

use mdpaste::{Config, ThemeName};

#[derive(Parser)]
#[command(name = "mdpaste")]
#[command(about = "Convert Markdown to inline-styled HTML ready to paste into a publishing editor")]
struct Cli {
    /// Input Markdown file (reads stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Output HTML file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, default_value = "mdpaste.toml")]
    config: PathBuf,

    /// Theme variant
    #[arg(long)]
    theme: Option<String>,

    /// Primary color as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Font family for the whole document
    #[arg(long)]
    font_family: Option<String>,

    /// Base font size, e.g. 16px
    #[arg(long)]
    font_size: Option<String>,

    /// Syntax highlighting theme for code blocks
    #[arg(long)]
    code_theme: Option<String>,

    /// List theme variants and code themes, then exit
    #[arg(long)]
    list_themes: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_themes {
        println!("Themes:");
        for name in ThemeName::ALL {
            println!("  {:<10} {}", name.as_str(), name.description());
        }
        println!("Code themes:");
        for name in mdpaste::highlight::code_themes() {
            println!("  {}", name);
        }
        return;
    }

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Flags win over the config file
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(color) = cli.color {
        config.primary_color = color;
    }
    if let Some(font_family) = cli.font_family {
        config.font_family = font_family;
    }
    if let Some(font_size) = cli.font_size {
        config.font_size = font_size;
    }
    if let Some(code_theme) = cli.code_theme {
        config.code_theme = code_theme;
    }

    // Read input
    let markdown = match &cli.input {
        Some(path) if path.as_os_str() != "-" => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        _ => {
            let mut content = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut content) {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            }
            content
        }
    };

    // Convert markdown to HTML
    let html = match mdpaste::render_markdown(&markdown, &config.to_options()) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Write HTML
    match cli.output {
        Some(output) => {
            if let Err(e) = fs::write(&output, html) {
                eprintln!("Error writing {}: {}", output.display(), e);
                std::process::exit(1);
            }
            eprintln!("Created {}", output.display());
        }
        None => println!("{}", html),
    }
}
