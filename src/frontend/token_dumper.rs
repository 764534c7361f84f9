use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints a nicer value for some tokens
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    /// Dump to stdout, coloured when the terminal supports it.
    pub fn dump(&self, tokens: &[Spanned]) -> io::Result<()> {
        let choice = if self.color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut out = StandardStream::stdout(choice);
        self.write_to(&mut out, tokens)
    }

    pub fn write_to(&self, out: &mut dyn WriteColor, tokens: &[Spanned]) -> io::Result<()> {
        for s in tokens {
            self.write_one(out, s)?;
        }
        Ok(())
    }

    fn write_one(&self, out: &mut dyn WriteColor, s: &Spanned) -> io::Result<()> {
        write!(out, "[{:02}:{:02}] ", s.span.line, s.span.col)?;

        let mut spec = ColorSpec::new();
        match Self::color(&s.token) {
            Some(c) => spec.set_fg(Some(c)),
            None => spec.set_dimmed(Self::is_trivia(&s.token)),
        };
        out.set_color(&spec)?;

        let kind = Self::kind(&s.token);
        if self.show_debug_repr {
            write!(out, "{:<8} {:?}", kind, s.token)?;
        } else {
            match &s.token {
                Token::Comment(c) => write!(out, "{:<8} COMMENT: {}", kind, c)?,
                Token::Newline => write!(out, "{:<8} NEWLINE", kind)?,
                other => write!(out, "{:<8} {}", kind, other.describe())?,
            }
        }

        out.reset()?;
        writeln!(out)
    }

    fn is_trivia(t: &Token) -> bool {
        matches!(t, Token::Newline | Token::Comment(_) | Token::Eof)
    }

    fn kind(t: &Token) -> &'static str {
        use Token::*;
        match t {
            // common specials
            Newline => "NEWLINE",
            Comment(_) => "COMMENT",
            Eof => "EOF",

            // literals
            Integer(_) => "INT",
            String(_) => "STRING",
            Bool(_) => "BOOL",

            // names
            Ident(_) => "IDENT",

            // structure
            LParen | RParen | Comma | Colon => "PUNCT",

            // ops / comparisons
            Plus | Minus | Star | Slash | Caret | Mod | Div | Assign => "OP",
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            And | Or | Not => "LOGIC",

            // everything else = keyword
            _ => "KEYWORD",
        }
    }

    fn color(t: &Token) -> Option<Color> {
        use Token::*;
        match t {
            String(_) => Some(Color::Green),
            Integer(_) | Bool(_) => Some(Color::Cyan),
            Ident(_) => Some(Color::Yellow),
            Plus | Minus | Star | Slash | Caret | Mod | Div | Assign => Some(Color::Magenta),
            EqEq | NotEq | Lt | LtEq | Gt | GtEq | And | Or | Not => Some(Color::Magenta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use termcolor::NoColor;

    fn dump_plain(source: &str, pretty: bool) -> String {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut dumper = TokenDumper::new().no_color();
        if pretty {
            dumper = dumper.pretty();
        }
        let mut out = NoColor::new(Vec::new());
        dumper.write_to(&mut out, &tokens).unwrap();
        std::string::String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_one_line_per_token() {
        let text = dump_plain("x = 1 // one\n", false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("[01:01] IDENT"));
        assert!(lines[2].contains("INT"));
        assert!(lines[3].contains("COMMENT"));
        assert!(lines[5].contains("EOF"));
    }

    #[test]
    fn test_pretty_mode() {
        let text = dump_plain("while x\n", true);
        assert!(text.contains("KEYWORD  'while'"));
        assert!(text.contains("identifier 'x'"));
        assert!(text.contains("NEWLINE"));
    }
}
