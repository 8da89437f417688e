//! Static kernel metadata a front-end advertises.

use serde::Serialize;

/// Name the bridge reports as its implementation.
pub const IMPLEMENTATION: &str = "ubit_kernel";
/// Version the bridge reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Greeting shown when a front-end starts.
pub const BANNER: &str = "Welcome to MicroPython on the BBC micro:bit";

/// Language the board speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct LanguageInfo {
    /// Language name.
    pub name: &'static str,
    /// Language version.
    pub version: &'static str,
    /// MIME type of source files.
    pub mimetype: &'static str,
    /// Source file extension.
    pub file_extension: &'static str,
    /// Editor highlighting mode.
    pub codemirror_mode: CodemirrorMode,
    /// Lexer used when rendering code.
    pub pygments_lexer: &'static str,
}

/// CodeMirror mode name and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CodemirrorMode {
    /// Mode name.
    pub name: &'static str,
    /// Language version the mode targets.
    pub version: u8,
}

/// MicroPython, as a Python 3 dialect.
pub const LANGUAGE: LanguageInfo = LanguageInfo {
    name: "python",
    version: "3",
    mimetype: "text/x-python",
    file_extension: ".py",
    codemirror_mode: CodemirrorMode {
        name: "python",
        version: 3,
    },
    pygments_lexer: "python3",
};

/// A documentation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct HelpLink {
    /// Link text.
    pub text: &'static str,
    /// Target URL.
    pub url: &'static str,
}

/// Documentation for the board's MicroPython port.
pub const HELP_LINKS: &[HelpLink] = &[HelpLink {
    text: "micro:bit MicroPython",
    url: "http://microbit-micropython.readthedocs.org/en/latest/index.html",
}];
