use std::borrow::Cow;

use crate::error::LoadError;
use crate::section::{Entry, Section, Value, fold_name, trim};
use crate::{MAX_SIZE, MIN_SIZE};

/// Parses `buffer` into its sections, in the order they first appear.
///
/// # Errors
///
/// Returns [`LoadError::Size`] if the buffer is empty or larger than [`MAX_SIZE`].
pub fn parse(buffer: &[u8]) -> Result<Vec<Section>, LoadError> {
    check_size(u64::try_from(buffer.len()).unwrap_or(u64::MAX))?;

    let text = decode_data(buffer);
    Ok(Parser::new(&text).into_sections())
}

pub(crate) fn check_size(size: u64) -> Result<(), LoadError> {
    if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(LoadError::Size { size })
    }
}

// Calibration files are plain ASCII in practice, but older tools wrote Latin-1 names.
fn decode_data(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(data.iter().copied().map(char::from).collect()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first section header.
    None,
    SectionName,
    EntryName,
    EntryValue,
    /// Inside a comment or the tail of a section header.
    WaitEol,
    /// Skipping line breaks before resuming.
    WaitSol,
}

/// Represents an on-going parse.
#[derive(Debug)]
pub struct Parser<'a> {
    text: &'a str,
    state: State,
    /// State to continue with once `WaitEol`/`WaitSol` reaches the next line.
    resume: State,
    /// Byte offset where the token being captured starts.
    start: usize,
    sections: Vec<Section>,
    section: Option<usize>,
    entry: Option<usize>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            state: State::None,
            resume: State::None,
            start: 0,
            sections: Vec::with_capacity(16),
            section: None,
            entry: None,
        }
    }
}

impl Parser<'_> {
    pub fn into_sections(mut self) -> Vec<Section> {
        let text = self.text;

        for (i, c) in text.char_indices() {
            self.step(i, c);
        }

        // Flush whatever the last line left unterminated.
        let end = text.len();
        match self.state {
            State::EntryName => self.close_entry_name(end, '\n'),
            State::EntryValue => self.close_entry_value(end, '\n'),
            State::SectionName => log::trace!("dropping unterminated section header at EOF"),
            State::None | State::WaitEol | State::WaitSol => {}
        }

        self.sections
    }

    fn step(&mut self, i: usize, c: char) {
        match self.state {
            State::None => match c {
                ';' => self.wait_eol(State::None),
                '[' => self.open_section(i),
                _ => {}
            },
            State::SectionName => match c {
                ';' => self.wait_eol(State::None),
                ']' => self.close_section(i),
                _ => {}
            },
            State::EntryName => {
                if matches!(c, '=' | ';' | '[' | '\r' | '\n') {
                    self.close_entry_name(i, c);
                }
            }
            State::EntryValue => {
                if matches!(c, ';' | '[' | '\r' | '\n') {
                    self.close_entry_value(i, c);
                }
            }
            State::WaitEol => {
                if is_newline(c) {
                    self.state = State::WaitSol;
                }
            }
            State::WaitSol => {
                if c == '[' {
                    self.open_section(i);
                } else if !is_newline(c) {
                    self.start = i;
                    self.state = self.resume;
                    // The first character of the line may itself be a delimiter.
                    self.step(i, c);
                }
            }
        }
    }

    fn wait_eol(&mut self, resume: State) {
        self.resume = resume;
        self.state = State::WaitEol;
    }

    fn wait_sol(&mut self, resume: State) {
        self.resume = resume;
        self.state = State::WaitSol;
    }

    fn open_section(&mut self, i: usize) {
        self.start = i + 1;
        self.state = State::SectionName;
    }

    fn close_section(&mut self, i: usize) {
        let name = fold_name(&self.text[self.start..i]);

        if name.is_empty() {
            log::trace!("ignoring empty section name at offset {i}");
            self.state = State::None;
            return;
        }

        // A re-opened section continues the existing one.
        let index = if let Some(index) = self.sections.iter().position(|s| s.name() == name) {
            index
        } else {
            self.sections.push(Section::new(&name));
            self.sections.len() - 1
        };

        self.section = Some(index);
        self.entry = None;
        self.wait_eol(State::EntryName);
    }

    fn close_entry_name(&mut self, i: usize, c: char) {
        let name = fold_name(&self.text[self.start..i]);
        let created = !name.is_empty();

        if created {
            // `key=value` makes a scalar; a bare line is the header of a list.
            let value = if c == '=' {
                Value::Scalar(String::new())
            } else {
                Value::List(Vec::new())
            };
            self.push_entry(Entry::new(&name, value));
        }

        let next = if created {
            State::EntryValue
        } else {
            State::EntryName
        };

        match c {
            '=' if created => {
                self.start = i + 1;
                self.state = State::EntryValue;
            }
            '=' | ';' => self.wait_eol(next),
            '[' => self.open_section(i),
            _ => self.wait_sol(next),
        }
    }

    fn close_entry_value(&mut self, i: usize, c: char) {
        let text = self.text;
        let value = trim(&text[self.start..i]);

        let next = match self.pending_value() {
            Some(Value::Scalar(scalar)) => {
                value.clone_into(scalar);
                State::EntryName
            }
            Some(Value::List(values)) => {
                if !value.is_empty() {
                    values.push(value.to_owned());
                }
                State::EntryValue
            }
            None => State::EntryName,
        };

        match c {
            '[' => self.open_section(i),
            ';' => self.wait_eol(next),
            _ => self.wait_sol(next),
        }
    }

    fn push_entry(&mut self, entry: Entry) {
        if let Some(section) = self.section.and_then(|i| self.sections.get_mut(i)) {
            section.push(entry);
            self.entry = Some(section.entries().len() - 1);
        } else {
            log::trace!("ignoring entry {:?} outside of any section", entry.name());
            self.entry = None;
        }
    }

    fn pending_value(&mut self) -> Option<&mut Value> {
        let section = self.sections.get_mut(self.section?)?;
        let entry = section.entries_mut().get_mut(self.entry?)?;
        Some(entry.value_mut())
    }
}

fn is_newline(c: char) -> bool {
    matches!(c, '\r' | '\n')
}
