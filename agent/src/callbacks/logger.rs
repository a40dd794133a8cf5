use crate::Result;
use crate::callbacks::Callback;
use crate::llm::Message;
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Remembers which messages a callback has already seen.
#[derive(Default)]
pub(crate) struct HistoryCursor {
    last_hashes: Vec<u64>,
}

pub(crate) enum Advance {
    /// Messages from this index onwards are new.
    From(usize),
    /// Earlier messages were rewritten, the whole history is new.
    Cleared,
}

impl HistoryCursor {
    pub(crate) fn advance(&mut self, messages: &[Message]) -> Advance {
        let new_hashes = messages.iter().map(Message::get_hash).collect::<Vec<_>>();

        let prefix_match_len = new_hashes
            .iter()
            .zip(self.last_hashes.iter())
            .take_while(|&(a, b)| a == b)
            .count();

        let advance = if prefix_match_len != self.last_hashes.len() {
            Advance::Cleared
        } else {
            Advance::From(self.last_hashes.len())
        };

        self.last_hashes = new_hashes;
        advance
    }
}

pub struct MessageLogger<W: Write + Send> {
    cursor: HistoryCursor,
    writer: W,
    step: u32,
}

impl MessageLogger<BufWriter<File>> {
    pub fn create(name: &str, path: &Path) -> Result<Box<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(name, BufWriter::new(File::create(path)?))
    }
}

impl<W: Write + Send> MessageLogger<W> {
    pub fn new(name: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "## {}\n\n", name)?;

        Ok(Box::new(Self {
            cursor: HistoryCursor::default(),
            writer,
            step: 0,
        }))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn display_messages(&mut self, messages: &[Message]) -> Result<()> {
        writeln!(self.writer, "### Step {}\n", self.step)?;

        messages
            .iter()
            .try_for_each(|m| write!(self.writer, "{}", m))?;

        writeln!(self.writer, "---\n")?;

        Ok(())
    }

    fn display_history_cleared(&mut self) -> Result<()> {
        write!(self.writer, "## [HISTORY CLEARED]\n\n")?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> Callback for MessageLogger<W> {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        match self.cursor.advance(&messages) {
            Advance::Cleared => {
                self.display_history_cleared()?;
                self.display_messages(&messages)?;
            }
            Advance::From(start) => self.display_messages(&messages[start..])?,
        }

        self.writer.flush()?;

        self.step += 1;

        Ok(messages)
    }
}
