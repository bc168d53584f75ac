// Console input collaborators

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

/// Integer prompt used by the interactive device selection.
pub trait UserInput {
    /// Prompt for an integer, offering `default` on an empty line. `None`
    /// means the response was not a number.
    fn get_integer(&mut self, prompt: &str, default: usize) -> Option<usize>;
}

pub struct ConsoleInput;

impl UserInput for ConsoleInput {
    fn get_integer(&mut self, prompt: &str, default: usize) -> Option<usize> {
        print!("{} [{}]: ", prompt, default);
        io::stdout().flush().ok()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line).ok()?;
        let line = line.trim();
        if line.is_empty() {
            return Some(default);
        }
        line.parse().ok()
    }
}

/// Blocks until the user presses Enter.
pub async fn wait_for_enter() -> io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map(|_| ())
}
