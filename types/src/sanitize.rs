//! Terminal-safe rendering of untrusted text.
//!
//! Agent messages, generated file contents and server error bodies all come
//! from the backend and end up in a terminal. Escape sequences in them could
//! move the cursor, rewrite the screen or set the clipboard (OSC 52), so they
//! are stripped before display.

use std::borrow::Cow;
use std::iter::Peekable;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{009b}';

/// Strip escape sequences and control characters other than `\n`, `\t`, `\r`.
///
/// Borrows when the input is already clean.
///
/// ```
/// use kiln_types::strip_terminal_controls;
///
/// assert_eq!(strip_terminal_controls("plain"), "plain");
/// assert_eq!(strip_terminal_controls("a\x1b[2Jb"), "ab");
/// ```
#[must_use]
pub fn strip_terminal_controls(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_disallowed) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ESC => skip_escape(&mut chars),
            C1_CSI => skip_csi(&mut chars),
            c if is_disallowed(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_disallowed(c: char) -> bool {
    match c {
        '\n' | '\t' | '\r' => false,
        c => c <= '\x1f' || c == '\x7f' || ('\u{0080}'..='\u{009f}').contains(&c),
    }
}

fn skip_escape<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    let Some(&next) = chars.peek() else {
        return;
    };
    match next {
        '[' => {
            chars.next();
            skip_csi(chars);
        }
        ']' | 'P' | '^' | '_' => {
            chars.next();
            skip_string(chars, next == ']');
        }
        '(' | ')' | '*' | '+' | '#' | ' ' => {
            chars.next();
            chars.next();
        }
        '7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<' => {
            chars.next();
        }
        _ => {}
    }
}

/// Parameter and intermediate bytes, then one final byte in `0x40..=0x7e`.
fn skip_csi<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(&c) = chars.peek() {
        if ('\x40'..='\x7e').contains(&c) {
            chars.next();
            return;
        }
        if !('\x20'..='\x3f').contains(&c) {
            return;
        }
        chars.next();
    }
}

/// OSC/DCS/PM/APC bodies end at ST (`ESC \`). OSC also accepts BEL.
fn skip_string<I: Iterator<Item = char>>(chars: &mut Peekable<I>, bel_terminates: bool) {
    while let Some(c) = chars.next() {
        if bel_terminates && c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}
