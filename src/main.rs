use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pyblocks::kernel::{submit, JupyterKernel};
use pyblocks::notebook::{load_session, save_session, to_jupyter};
use pyblocks::render::{render_all, to_html, to_text};
use pyblocks::session::parse_script;
use pyblocks::store::{EditorState, LineSequence, SelectionCursor};
use pyblocks::{
  codegen, generate_with, templates, token_line, CodeLine, CodegenOptions,
  EditorSession, SessionConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the Python source of a session file
  Generate {
    file: PathBuf,
    /// Leading comment line
    #[arg(long)]
    header: Option<String>,
  },
  /// Show the editor rows of a session file
  Render {
    file: PathBuf,
    #[arg(long)]
    html: bool,
  },
  /// List the built-in templates
  Templates,
  /// Print a built-in template as Python, or as a session file with --json
  Template {
    name: String,
    #[arg(long)]
    json: bool,
  },
  /// Split a line of Python into editor tokens
  Tokens { text: String },
  /// Apply editor commands to a session file and save it
  Edit {
    /// Created when missing
    file: PathBuf,
    /// Command file; read from stdin when omitted
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(
      long,
      env = "PYBLOCKS_HISTORY_DEPTH",
      default_value_t = pyblocks::store::DEFAULT_HISTORY_DEPTH
    )]
    history_depth: usize,
  },
  /// Write the generated source as a Jupyter notebook
  Export {
    file: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
  },
  /// Execute the generated source on a running kernel
  Run {
    file: PathBuf,
    #[arg(long, env = "PYBLOCKS_CONNECTION_FILE")]
    connection_file: PathBuf,
    /// Wait this many milliseconds for stdout
    #[arg(long)]
    capture_ms: Option<u64>,
  },
}

fn read_lines(path: &Path) -> anyhow::Result<Vec<CodeLine>> {
  let session = load_session(path)
    .with_context(|| format!("loading session {}", path.display()))?;
  Ok(session.lines)
}

fn main() -> anyhow::Result<()> {
  pyblocks::init_tracing();
  let cli = Cli::parse();

  match cli.command {
    Commands::Generate { file, header } => {
      let lines = read_lines(&file)?;
      print!("{}", generate_with(&lines, &CodegenOptions { header }));
    }

    Commands::Render { file, html } => {
      let lines = LineSequence::new(read_lines(&file)?);
      let state = EditorState {
        cursor: SelectionCursor::default().clamped(lines.len()),
        lines,
      };
      let view = render_all(&state);
      if html {
        print!("{}", to_html(&view));
      } else {
        print!("{}", to_text(&view));
      }
    }

    Commands::Templates => {
      for template in templates::TEMPLATES {
        println!("{:<22}{}", template.name, template.description);
      }
    }

    Commands::Template { name, json } => {
      let lines = templates::template(&name)?;
      if json {
        print!(
          "{}",
          pyblocks::notebook::session_to_string(&lines, chrono::Utc::now())?
        );
      } else {
        print!("{}", codegen::generate(&lines));
      }
    }

    Commands::Tokens { text } => {
      for token in token_line::parse_tokens(&text)? {
        println!("{:<22}{}", token.token_type.as_str(), token.data);
      }
    }

    Commands::Edit {
      file,
      script,
      history_depth,
    } => {
      let lines = if file.exists() {
        read_lines(&file)?
      } else {
        Vec::new()
      };
      let script = match script {
        Some(path) => std::fs::read_to_string(&path)
          .with_context(|| format!("reading script {}", path.display()))?,
        None => {
          let mut text = String::new();
          std::io::stdin().read_to_string(&mut text)?;
          text
        }
      };

      let config = SessionConfig {
        history_depth,
        ..SessionConfig::default()
      };
      let mut session = EditorSession::new(lines, config);
      session.update_all(parse_script(&script)?)?;
      save_session(&file, &session.lines().to_vec())?;
      print!("{}", to_text(&session.view()));
      session.teardown();
    }

    Commands::Export { file, output } => {
      let code = codegen::generate(&read_lines(&file)?);
      std::fs::write(&output, to_jupyter(&code))
        .with_context(|| format!("writing {}", output.display()))?;
    }

    Commands::Run {
      file,
      connection_file,
      capture_ms,
    } => {
      let lines = read_lines(&file)?;
      let mut kernel = JupyterKernel::from_connection_file(&connection_file)?;
      if let Some(ms) = capture_ms {
        kernel = kernel.with_stdout_capture(Duration::from_millis(ms));
      }
      let ack = submit(&mut kernel, &lines, &CodegenOptions::default())?;
      eprintln!("submitted {}", ack.msg_id);
      if let Some(stdout) = ack.stdout {
        print!("{stdout}");
      }
    }
  }

  Ok(())
}
