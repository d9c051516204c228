use clap::{Args, Parser, Subcommand, ValueEnum};
use spindle_extglob::{grammar::verbatim_renderer, regex_renderer, ExtglobKind};
use spindle_parser::{Document, ErrorMode, ParserOptions};
use spindle_render::{RenderOptions, Renderer, SourceMapMode};
use std::path::Path;

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "Spindle: parse and render extglob patterns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a pattern and print the tree as JSON
    Parse(Input),

    /// Parse a pattern and render it back out
    Render {
        #[command(flatten)]
        input: Input,

        /// Output form
        #[arg(long, value_enum, default_value_t = Target::Verbatim)]
        to: Target,

        /// Source map mode
        #[arg(long, value_enum, default_value_t = SourceMapArg::False)]
        sourcemap: SourceMapArg,
    },

    /// Check a pattern for errors without producing output
    Check(Input),
}

#[derive(Args)]
struct Input {
    /// The pattern, or a file path when --file is given
    pattern: String,

    /// Read the pattern from a file
    #[arg(long)]
    file: bool,

    /// Report unclosed groups as errors
    #[arg(long)]
    strict: bool,

    /// Collect diagnostics instead of stopping at the first one
    #[arg(long)]
    collect: bool,

    /// Label used in positions and error messages
    #[arg(long)]
    label: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Verbatim,
    Regex,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceMapArg {
    False,
    True,
    Generator,
}

impl From<SourceMapArg> for SourceMapMode {
    fn from(arg: SourceMapArg) -> Self {
        match arg {
            SourceMapArg::False => SourceMapMode::Disabled,
            SourceMapArg::True => SourceMapMode::Enabled,
            SourceMapArg::Generator => SourceMapMode::Generator,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Parse(input) => cmd_parse(&input),
        Command::Render {
            input,
            to,
            sourcemap,
        } => cmd_render(&input, to, sourcemap.into()),
        Command::Check(input) => cmd_check(&input),
    }
}

/// The pattern text and the label it is reported under. Patterns given on
/// the command line are labelled `argv`, files by their path.
fn read_source(input: &Input) -> (String, &str) {
    if !input.file {
        let label = input.label.as_deref().unwrap_or("argv");
        return (input.pattern.clone(), label);
    }

    let path = Path::new(&input.pattern);
    let label = input.label.as_deref().unwrap_or(&input.pattern);
    match std::fs::read_to_string(path) {
        // Trailing newlines from editors are not part of the pattern.
        Ok(source) => (source.trim_end_matches(['\n', '\r']).to_string(), label),
        Err(e) => {
            eprintln!("Error reading pattern file {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn parse_input(input: &Input) -> Document<ExtglobKind> {
    let (source, label) = read_source(input);

    let mut options = ParserOptions::new()
        .source_label(label)
        .strict(input.strict);
    if input.collect {
        options = options.error_mode(ErrorMode::Collect);
    }

    match spindle_extglob::parse(&source, options) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn report_diagnostics(doc: &Document<ExtglobKind>) {
    for diagnostic in doc.errors() {
        eprintln!("warning: {diagnostic}");
    }
}

fn cmd_parse(input: &Input) {
    let doc = parse_input(input);
    report_diagnostics(&doc);
    print_json(&doc);
}

fn cmd_render(input: &Input, to: Target, mode: SourceMapMode) {
    let doc = parse_input(input);
    report_diagnostics(&doc);

    let options = RenderOptions::new().sourcemap(mode);
    let mut renderer: Renderer<ExtglobKind> = match to {
        Target::Verbatim => verbatim_renderer(options),
        Target::Regex => regex_renderer(options),
    };

    match renderer.render(&doc) {
        Ok(rendered) if rendered.source_map.is_some() => print_json(&rendered),
        Ok(rendered) => println!("{}", rendered.output),
        Err(e) => {
            eprintln!("{e}");
            let partial = renderer.partial_output();
            if !partial.is_empty() {
                eprintln!("Partial output: {partial}");
            }
            std::process::exit(1);
        }
    }
}

fn cmd_check(input: &Input) {
    let doc = parse_input(input);
    report_diagnostics(&doc);
    if doc.has_errors() {
        eprintln!("{} problem(s) found", doc.errors().len());
        std::process::exit(1);
    }
    eprintln!("OK: {}", doc.label());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render_args(args: &[&str]) -> Result<(Target, SourceMapArg), clap::Error> {
        let cli = Cli::try_parse_from(["spindle", "render"].iter().chain(args))?;
        match cli.command {
            Command::Render { to, sourcemap, .. } => Ok((to, sourcemap)),
            _ => panic!("Expected render command"),
        }
    }

    fn input(pattern: &str, file: bool, label: Option<&str>) -> Input {
        Input {
            pattern: pattern.to_string(),
            file,
            strict: false,
            collect: false,
            label: label.map(str::to_string),
        }
    }

    // =========================================================================
    // Flags
    // =========================================================================

    #[test]
    fn test_sourcemap_flag_values() {
        let (_, arg) = render_args(&["*.rs"]).unwrap();
        assert_eq!(SourceMapMode::from(arg), SourceMapMode::Disabled);
        let (_, arg) = render_args(&["*.rs", "--sourcemap", "true"]).unwrap();
        assert_eq!(SourceMapMode::from(arg), SourceMapMode::Enabled);
        let (_, arg) = render_args(&["*.rs", "--sourcemap", "generator"]).unwrap();
        assert_eq!(SourceMapMode::from(arg), SourceMapMode::Generator);
    }

    #[test]
    fn test_sourcemap_flag_rejects_unknown_value() {
        let err = render_args(&["*.rs", "--sourcemap", "vlq"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_target_flag() {
        let (to, _) = render_args(&["*.rs", "--to", "regex"]).unwrap();
        assert!(matches!(to, Target::Regex));
    }

    // =========================================================================
    // Input
    // =========================================================================

    #[test]
    fn test_pattern_argument_labelled_argv() {
        let arg = input("*.{rs,toml}", false, None);
        assert_eq!(read_source(&arg), ("*.{rs,toml}".to_string(), "argv"));

        let arg = input("*.rs", false, Some("cfg"));
        assert_eq!(read_source(&arg).1, "cfg");
    }

    #[test]
    fn test_pattern_file_labelled_by_path() {
        let path = std::env::temp_dir().join(format!("spindle-cli-{}.glob", std::process::id()));
        std::fs::write(&path, "src/**/*.rs\n").unwrap();
        let path_str = path.to_str().unwrap();

        let arg = input(path_str, true, None);
        let (source, label) = read_source(&arg);
        assert_eq!(source, "src/**/*.rs");
        assert_eq!(label, path_str);

        std::fs::remove_file(&path).unwrap();
    }
}
