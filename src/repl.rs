use crate::prompt;
use crate::rcfile::{history_path, load_eshrc};
use esh::completion::{format_list, Completer, Completion};
use esh::executor::claim_terminal;
use esh::resolver::Registry;
use esh::shell::{LineSource, Shell};
use esh::signals;
use rustyline::error::ReadlineError;
use rustyline::{Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyCode, KeyEvent, Modifiers, RepeatCount};
use rustyline::Result as RlResult;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Prompt shown while a quote is still open
const CONTINUATION_PROMPT: &str = "> ";

/// Tab: complete the word under the cursor. A second press with the line
/// and cursor unchanged lists the candidates.
struct TabHandler {
    registry: Arc<Registry>,
    /// Prompt currently shown, redrawn under a listing
    prompt: Arc<Mutex<String>>,
    state: Mutex<TabState>,
}

impl TabHandler {
    fn new(registry: Arc<Registry>, prompt: Arc<Mutex<String>>) -> Self {
        TabHandler {
            registry,
            prompt,
            state: Mutex::new(TabState::default()),
        }
    }
}

impl ConditionalEventHandler for TabHandler {
    fn handle(&self, _evt: &Event, _n: RepeatCount, _positive: bool, ctx: &EventContext) -> Option<Cmd> {
        let mut state = self.state.lock().ok()?;
        let prompt = self.prompt.lock().ok()?.clone();
        let completer = Completer::new(&self.registry);
        let mut out = io::stdout();
        Some(state.press(&completer, &prompt, ctx.line(), ctx.pos(), &mut out))
    }
}

/// Line and cursor left by the previous tab press
#[derive(Debug, Default)]
struct TabState {
    last: Option<(String, usize)>,
}

impl TabState {
    /// Editor command for a tab press at byte offset `pos`. A listing is
    /// written to `out`, followed by the prompt and line redrawn with the
    /// terminal cursor back at `pos`, so the editor's own layout stays valid.
    fn press(&mut self, completer: &Completer<'_>, prompt: &str, line: &str, pos: usize, out: &mut dyn Write) -> Cmd {
        let repeated = matches!(&self.last, Some((l, p)) if l == line && *p == pos);

        match completer.complete(line, pos, repeated) {
            Completion::Insert(text) => {
                self.last = None;
                Cmd::Insert(1, text)
            }
            Completion::List(items) => {
                if let Err(e) = draw_listing(out, &format_list(&items), prompt, line, pos) {
                    log::debug!("tab listing: {}", e);
                }
                self.last = Some((line.to_string(), pos));
                Cmd::Noop
            }
            Completion::Nothing => {
                self.last = Some((line.to_string(), pos));
                Cmd::Noop
            }
        }
    }
}

fn draw_listing(out: &mut dyn Write, listing: &str, prompt: &str, line: &str, pos: usize) -> io::Result<()> {
    write!(out, "\r\n{}\r\n{}{}", listing, prompt, line)?;
    let back = line.get(pos..).map_or(0, |tail| tail.chars().count());
    if back > 0 {
        write!(out, "\x1b[{}D", back)?;
    }
    out.flush()
}

/// Continuation lines come from the editor with the `> ` prompt
struct EditorLines<'a> {
    rl: &'a mut DefaultEditor,
    prompt: &'a Mutex<String>,
}

impl LineSource for EditorLines<'_> {
    fn continuation(&mut self) -> Option<String> {
        show_prompt(self.prompt, CONTINUATION_PROMPT);
        self.rl.readline(CONTINUATION_PROMPT).ok()
    }
}

fn show_prompt(slot: &Mutex<String>, prompt: &str) {
    if let Ok(mut current) = slot.lock() {
        current.clear();
        current.push_str(prompt);
    }
}

/// Run the interactive loop. Returns the shell's exit status.
pub(crate) fn run_repl() -> RlResult<i32> {
    signals::ignore_job_control_signals();
    claim_terminal();

    let registry = Arc::new(Registry::from_env());
    let mut shell = Shell::new(Arc::clone(&registry));
    shell.enable_job_control();

    let shown = Arc::new(Mutex::new(String::new()));
    let mut rl = DefaultEditor::new()?;
    rl.bind_sequence(
        KeyEvent(KeyCode::Tab, Modifiers::NONE),
        EventHandler::Conditional(Box::new(TabHandler::new(registry, Arc::clone(&shown)))),
    );

    let history_file = history_path();
    if let Some(ref path) = history_file {
        if let Err(e) = shell.history_mut().load(path) {
            log::warn!("cannot read {}: {}", path.display(), e);
        }
        for entry in shell.history().iter() {
            let _ = rl.add_history_entry(entry);
        }
    }

    load_eshrc(&mut shell);

    let status = loop {
        if let Some(code) = shell.exit_requested() {
            break code;
        }

        let prompt = prompt::render(shell.last_status());
        show_prompt(&shown, &prompt);
        match rl.readline(&prompt) {
            Ok(line) => {
                let before = shell.history().len();
                shell.execute(&line, &mut EditorLines { rl: &mut rl, prompt: &shown });
                if shell.history().len() > before {
                    if let Some(entry) = shell.history().iter().last() {
                        let _ = rl.add_history_entry(entry);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break shell.last_status(),
            Err(err) => {
                eprintln!("esh: {}", err);
                break 1;
            }
        }
    };

    if let Some(ref path) = history_file {
        if let Err(e) = shell.history().save(path) {
            log::warn!("cannot write {}: {}", path.display(), e);
        }
    }

    Ok(status)
}
