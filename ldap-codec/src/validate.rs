//! Syntax checks for distinguished names and attribute descriptions
//!
//! DNs follow the RFC 4514 string representation, read leniently: spaces
//! around separators and `=` are accepted, and `;` is accepted as an RDN
//! separator as in RFC 1779. Attribute descriptions follow RFC 4512
//! `descr / numericoid *( ";" option )`.

use once_cell::sync::Lazy;
use regex::Regex;

static ATTRIBUTE_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)+)(?:;[A-Za-z0-9-]+)*$")
        .unwrap_or_else(|e| panic!("invalid attribute description pattern: {}", e))
});

/// Check an attribute description such as `cn`, `2.5.4.3` or `userCertificate;binary`
pub fn is_valid_attribute_description(value: &str) -> bool {
    ATTRIBUTE_DESCRIPTION.is_match(value)
}

/// Check a DN, returning the reason it is malformed
///
/// The empty string is the valid root DN.
pub fn validate_dn(dn: &str) -> Result<(), &'static str> {
    let mut parser = DnParser::new(dn);
    parser.skip_spaces();
    if parser.at_end() {
        return Ok(());
    }
    loop {
        parser.rdn()?;
        match parser.bump() {
            None => return Ok(()),
            Some(b',') | Some(b';') => {}
            Some(_) => return Err("expected ',' between RDNs"),
        }
    }
}

/// Check a DN
pub fn is_valid_dn(dn: &str) -> bool {
    validate_dn(dn).is_ok()
}

/// Check a single, non-empty RDN such as `cn=Alice+uid=alice`
pub fn is_valid_rdn(rdn: &str) -> bool {
    let mut parser = DnParser::new(rdn);
    parser.rdn().is_ok() && parser.at_end()
}

struct DnParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DnParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// `rdn = ava *( "+" ava )`
    fn rdn(&mut self) -> Result<(), &'static str> {
        loop {
            self.ava()?;
            if self.peek() != Some(b'+') {
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn ava(&mut self) -> Result<(), &'static str> {
        self.skip_spaces();
        self.attribute_type()?;
        self.skip_spaces();
        if self.bump() != Some(b'=') {
            return Err("expected '=' after attribute type");
        }
        self.skip_spaces();
        self.value()
    }

    fn attribute_type(&mut self) -> Result<(), &'static str> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.skip_while(|c| c.is_ascii_alphanumeric() || c == b'-');
                Ok(())
            }
            Some(c) if c.is_ascii_digit() => {
                self.skip_while(|c| c.is_ascii_digit());
                let mut arcs = 1;
                while self.peek() == Some(b'.') {
                    self.pos += 1;
                    if self.skip_while(|c| c.is_ascii_digit()) == 0 {
                        return Err("empty arc in numeric OID");
                    }
                    arcs += 1;
                }
                if arcs < 2 {
                    return Err("numeric OID needs at least two arcs");
                }
                Ok(())
            }
            _ => Err("missing attribute type"),
        }
    }

    fn value(&mut self) -> Result<(), &'static str> {
        if self.peek() == Some(b'#') {
            self.pos += 1;
            let digits = self.skip_while(|c| c.is_ascii_hexdigit());
            if digits == 0 || digits % 2 != 0 {
                return Err("odd or empty hex string");
            }
            self.skip_spaces();
            return match self.peek() {
                None | Some(b',') | Some(b';') | Some(b'+') => Ok(()),
                Some(_) => Err("garbage after hex string"),
            };
        }

        loop {
            match self.peek() {
                None | Some(b',') | Some(b';') | Some(b'+') => return Ok(()),
                Some(b'\\') => {
                    self.pos += 1;
                    match self.bump() {
                        Some(c) if b" \"#+,;<=>\\".contains(&c) => {}
                        Some(c) if c.is_ascii_hexdigit() => {
                            if !self.bump().is_some_and(|c| c.is_ascii_hexdigit()) {
                                return Err("incomplete hex escape");
                            }
                        }
                        _ => return Err("invalid escape sequence"),
                    }
                }
                Some(b'"') | Some(b'<') | Some(b'>') | Some(0) => {
                    return Err("unescaped special character");
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dns() {
        for dn in [
            "",
            "dc=example,dc=com",
            "cn=Alice Smith, ou=People ; dc=example",
            "cn=Alice+uid=alice,dc=example",
            "2.5.4.3=Bob,dc=example",
            "cn=\\2C escaped\\, comma,dc=example",
            "cn=#04024869,dc=example",
            "cn=,dc=example",
            "cn=Zoë,dc=example",
        ] {
            assert!(is_valid_dn(dn), "{:?}", dn);
        }
    }

    #[test]
    fn test_invalid_dns() {
        for dn in [
            "invalid",
            "cn",
            "=value",
            "cn=a,,dc=com",
            "cn=a,",
            "cn=a<b",
            "cn=trailing\\",
            "cn=\\zz",
            "cn=#123",
            "2.5=x,1=y",
            "cn=#0102 x",
        ] {
            assert!(!is_valid_dn(dn), "{:?}", dn);
        }
    }

    #[test]
    fn test_validate_dn_reason() {
        assert_eq!(validate_dn("cn"), Err("expected '=' after attribute type"));
    }

    #[test]
    fn test_rdn() {
        assert!(is_valid_rdn("cn=Alice"));
        assert!(is_valid_rdn("cn=Alice+sn=Smith"));
        assert!(!is_valid_rdn(""));
        assert!(!is_valid_rdn("cn=Alice,dc=example"));
    }

    #[test]
    fn test_attribute_description() {
        assert!(is_valid_attribute_description("cn"));
        assert!(is_valid_attribute_description("userCertificate;binary"));
        assert!(is_valid_attribute_description("2.5.4.3"));
        assert!(is_valid_attribute_description("cn;lang-en;x-foo"));
        assert!(!is_valid_attribute_description(""));
        assert!(!is_valid_attribute_description("1cn"));
        assert!(!is_valid_attribute_description("cn;"));
        assert!(!is_valid_attribute_description("c n"));
        assert!(!is_valid_attribute_description("2"));
    }
}
