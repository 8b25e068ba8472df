//! REPL (Read-Eval-Print Loop) for DPL

use crate::error::{format_runtime_error, report_error, Error};
use crate::interp::{self, builtins, exec_in, root_namespace_with_output, NamespaceRef, OutputRef, Value};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".dpl_history";

/// Evaluation state shared by every input line: one root namespace
pub struct Session {
    namespace: NamespaceRef,
    builtin_names: HashSet<String>,
}

impl Session {
    /// New session whose `print`/`println` write to stdout
    pub fn new() -> Self {
        Self::with_output(interp::stdout())
    }

    /// New session whose `print`/`println` write to `out`
    pub fn with_output(out: OutputRef) -> Self {
        let builtin_names = builtins(out.clone()).into_keys().collect();
        Session {
            namespace: root_namespace_with_output(HashMap::new(), out),
            builtin_names,
        }
    }

    /// Compile and run one input against the session namespace
    pub fn eval(&self, input: &str) -> Result<Value, Error> {
        let program = crate::compile(input)?;
        Ok(exec_in(&program, &self.namespace)?)
    }

    /// Variables created in this session, sorted by name, rendered as text
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.namespace
            .borrow()
            .bindings()
            .iter()
            .filter(|(name, _)| !self.builtin_names.contains(*name))
            .map(|(name, value)| (name.clone(), value.to_text()))
            .collect()
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;

        // Try to find history file in home directory
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session: Session::new(),
            history_path,
        };

        // Load history if available
        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("DPL REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if handle_command(line, &self.session) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        // Save history
        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Evaluate user input, printing any non-null result
    fn eval_input(&mut self, input: &str) {
        match self.session.eval(input) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{value}"),
            Err(Error::Compile(err)) => report_error("<repl>", input, &err),
            Err(Error::Runtime(err)) => {
                eprintln!("{}", format_runtime_error(&err, Some(self.session.namespace())));
            }
        }
    }
}

/// Handle REPL commands (starting with :). Returns true to exit.
fn handle_command(cmd: &str, session: &Session) -> bool {
    match cmd {
        ":quit" | ":q" | ":exit" => {
            println!("Goodbye!");
            true
        }
        ":help" | ":h" | ":?" => {
            print_help();
            false
        }
        ":clear" => {
            print!("\x1B[2J\x1B[1;1H");
            false
        }
        ":vars" => {
            for (name, value) in session.vars() {
                println!("{name} = {value}");
            }
            false
        }
        _ => {
            println!("Unknown command: {cmd}");
            println!("Type :help for help.");
            false
        }
    }
}

fn print_help() {
    println!("DPL REPL Commands:");
    println!("  :help, :h, :?   Show this help");
    println!("  :quit, :q       Exit the REPL");
    println!("  :clear          Clear the screen");
    println!("  :vars           List variables defined in this session");
    println!();
    println!("You can enter:");
    println!("  - Bindings: n := 10; n = n + 1");
    println!("  - Functions: sq := (x) -> {{ x * x }}; sq(4)");
    println!("  - Control flow: for i, v in [1, 2] {{ println(i, v) }}");
    println!();
    println!("Built-in functions:");
    println!("  len(v)          Length of text, array or object");
    println!("  append(a, ...)  New array with values appended");
    println!("  print(...)      Print values without newline");
    println!("  println(...)    Print values separated by spaces");
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
