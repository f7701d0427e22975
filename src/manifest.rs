use crate::config::AssemblyIdentity;
use std::{
    borrow::Cow,
    io::{self, Write},
};

/// Escapes the characters that would end or corrupt a double-quoted XML attribute.
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }

    Cow::Owned(escaped)
}

/// Streams a Win32 side-by-side assembly manifest.
///
/// The header goes out on [`ManifestWriter::begin`], one `<file>` line per call to
/// [`ManifestWriter::file`], and the closing tag on [`ManifestWriter::finish`]. Attribute
/// values pass through [`escape_attr`].
pub struct ManifestWriter<W: Write> {
    out: W,
}
impl<W: Write> ManifestWriter<W> {
    pub fn begin(mut out: W, identity: &AssemblyIdentity) -> io::Result<Self> {
        writeln!(
            out,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#
        )?;
        writeln!(
            out,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">"#
        )?;
        writeln!(out)?;
        writeln!(
            out,
            r#"  <assemblyIdentity type="Win32" name="{}" version="{}" processorArchitecture="{}" />"#,
            escape_attr(&identity.name),
            escape_attr(&identity.version),
            escape_attr(&identity.architecture)
        )?;

        Ok(Self { out })
    }

    pub fn file(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, r#"  <file name="{}" />"#, escape_attr(name))
    }

    pub fn finish(mut self) -> io::Result<W> {
        writeln!(self.out)?;
        write!(self.out, "</assembly>")?;
        self.out.flush()?;

        Ok(self.out)
    }
}
