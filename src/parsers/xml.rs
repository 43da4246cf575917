//! Streaming cursor over an XML report.
//!
//! Every XML based parser follows the same shape: check the root element,
//! then loop over start tags dispatching on their local name and reading
//! attributes off the current tag. `XmlCursor` owns the open file and the
//! reader state for that loop and turns every failure into a `ParseError`
//! naming the report and the line the reader had reached.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{ParseError, ReportError, Result};

/// Counts newlines as the XML reader consumes its input.
struct LineCounter<R> {
    inner: R,
    newlines: u64,
}

impl<R: Read> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.newlines += count_newlines(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineCounter<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // Already buffered, so this does not touch the underlying file.
        if let Ok(buf) = self.inner.fill_buf() {
            let n = amt.min(buf.len());
            self.newlines += count_newlines(&buf[..n]);
        }
        self.inner.consume(amt);
    }
}

fn count_newlines(bytes: &[u8]) -> u64 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u64
}

/// A start tag with its attributes, keyed by local name.
#[derive(Debug)]
struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Tag {
    fn read(start: &BytesStart<'_>) -> std::result::Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self { name, attributes })
    }
}

enum Step {
    Tag(Tag),
    Open(Tag),
    Close,
    StrayText,
    Other,
    Eof,
}

pub struct XmlCursor {
    path: PathBuf,
    reader: Reader<LineCounter<BufReader<File>>>,
    buf: Vec<u8>,
    current: Option<Tag>,
    seen_tag: bool,
    depth: usize,
}

impl fmt::Debug for XmlCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlCursor")
            .field("path", &self.path)
            .field("line", &self.line())
            .finish_non_exhaustive()
    }
}

impl XmlCursor {
    /// Open the report at `path`. The file stays open until the cursor is
    /// dropped.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
        let mut reader = Reader::from_reader(LineCounter {
            inner: BufReader::new(file),
            newlines: 0,
        });
        reader.trim_text(true);

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            buf: Vec::new(),
            current: None,
            seen_tag: false,
            depth: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based line the reader has reached.
    pub fn line(&self) -> u64 {
        self.reader.get_ref().newlines + 1
    }

    /// Advance to the next start tag and return its local name, or `None`
    /// at the end of the document.
    pub fn next_tag(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => Tag::read(&e).map(Step::Open),
                Ok(Event::Empty(e)) => Tag::read(&e).map(Step::Tag),
                Ok(Event::End(_)) => Ok(Step::Close),
                Ok(Event::Text(_)) if !self.seen_tag => Ok(Step::StrayText),
                Ok(Event::Eof) => Ok(Step::Eof),
                Ok(_) => Ok(Step::Other),
                Err(e) => Err(e),
            };

            match step.map_err(|e| self.xml_error(&e))? {
                Step::Open(tag) => {
                    self.depth += 1;
                    return Ok(Some(self.enter(tag)));
                }
                Step::Tag(tag) => return Ok(Some(self.enter(tag))),
                Step::Close => self.depth = self.depth.saturating_sub(1),
                Step::StrayText => {
                    return Err(self.parse_error(
                        "Error while parsing the XML file: unexpected content before the root element",
                    ));
                }
                Step::Eof => {
                    self.current = None;
                    if self.depth > 0 {
                        return Err(self.parse_error(
                            "Error while parsing the XML file: unexpected end of file",
                        ));
                    }
                    return Ok(None);
                }
                Step::Other => {}
            }
        }
    }

    fn enter(&mut self, tag: Tag) -> String {
        let name = tag.name.clone();
        self.current = Some(tag);
        self.seen_tag = true;
        name
    }

    /// Advance to the first start tag and check that it is `<name>`.
    pub fn require_root_tag(&mut self, name: &str) -> Result<()> {
        match self.next_tag()? {
            Some(tag) if tag == name => Ok(()),
            _ => Err(self.parse_error(format!("Missing root element <{name}>"))),
        }
    }

    /// Local name of the tag the cursor is on.
    pub fn tag_name(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.name.as_str())
    }

    pub fn optional_attribute(&self, name: &str) -> Option<&str> {
        self.current.as_ref().and_then(|tag| {
            tag.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        })
    }

    pub fn require_attribute(&self, name: &str) -> Result<&str> {
        self.optional_attribute(name).ok_or_else(|| {
            self.parse_error(format!(
                "Missing attribute \"{name}\" in element <{}>",
                self.tag_name().unwrap_or_default()
            ))
        })
    }

    pub fn require_int_attribute(&self, name: &str) -> Result<i64> {
        let value = self.require_attribute(name)?;
        value.parse::<i64>().map_err(|_| {
            self.parse_error(format!(
                "Expected an integer instead of \"{value}\" for the attribute \"{name}\""
            ))
        })
    }

    /// Integer value of `name`, or zero when it is absent or not a number.
    pub fn int_attribute_or_zero(&self, name: &str) -> i64 {
        self.optional_attribute(name)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// Pin a schema or version attribute to an expected value.
    pub fn require_attribute_equals(&self, name: &str, expected: i64) -> Result<()> {
        let actual = self.require_int_attribute(name)?;
        if actual != expected {
            return Err(self.parse_error(format!(
                "Expected \"{expected}\" instead of \"{actual}\" for the \"{name}\" attribute"
            )));
        }
        Ok(())
    }

    /// Build an error located at the cursor's current line.
    pub fn parse_error(&self, message: impl Into<String>) -> ReportError {
        ReportError::Parse(ParseError::new(message, &self.path, Some(self.line())))
    }

    fn xml_error(&self, err: &quick_xml::Error) -> ReportError {
        self.parse_error(format!("Error while parsing the XML file: {err}"))
    }
}
