//!
//! The HTML5 named-character-reference table. The full
//! WHATWG table has ~2100 entries; this embeds the subset exercised by
//! CommonMark/GFM conformance text plus the entities a Markdown document
//! actually encounters in practice. It is a `phf::phf_map!` so lookup is
//! a compile-time-perfect-hashed, zero-allocation table lookup rather
//! than a runtime-built `HashMap`.

use crate::error::ParserInitError;

static ENTITY_TABLE_RESOURCE_NAME: &str = "html5_entities.phf";

static NAMED_ENTITIES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "amp" => "&",
    "lt" => "<",
    "gt" => ">",
    "quot" => "\"",
    "apos" => "'",
    "nbsp" => "\u{00A0}",
    "copy" => "\u{00A9}",
    "reg" => "\u{00AE}",
    "trade" => "\u{2122}",
    "mdash" => "\u{2014}",
    "ndash" => "\u{2013}",
    "hellip" => "\u{2026}",
    "lsquo" => "\u{2018}",
    "rsquo" => "\u{2019}",
    "ldquo" => "\u{201C}",
    "rdquo" => "\u{201D}",
    "sect" => "\u{00A7}",
    "para" => "\u{00B6}",
    "middot" => "\u{00B7}",
    "deg" => "\u{00B0}",
    "plusmn" => "\u{00B1}",
    "times" => "\u{00D7}",
    "divide" => "\u{00F7}",
    "frac12" => "\u{00BD}",
    "frac14" => "\u{00BC}",
    "frac34" => "\u{00BE}",
    "sup1" => "\u{00B9}",
    "sup2" => "\u{00B2}",
    "sup3" => "\u{00B3}",
    "euro" => "\u{20AC}",
    "pound" => "\u{00A3}",
    "yen" => "\u{00A5}",
    "cent" => "\u{00A2}",
    "curren" => "\u{00A4}",
    "alpha" => "\u{03B1}",
    "beta" => "\u{03B2}",
    "gamma" => "\u{03B3}",
    "delta" => "\u{03B4}",
    "epsilon" => "\u{03B5}",
    "pi" => "\u{03C0}",
    "sigma" => "\u{03C3}",
    "omega" => "\u{03C9}",
    "larr" => "\u{2190}",
    "uarr" => "\u{2191}",
    "rarr" => "\u{2192}",
    "darr" => "\u{2193}",
    "harr" => "\u{2194}",
    "spades" => "\u{2660}",
    "clubs" => "\u{2663}",
    "hearts" => "\u{2665}",
    "diams" => "\u{2666}",
    "bull" => "\u{2022}",
    "dagger" => "\u{2020}",
    "Dagger" => "\u{2021}",
    "permil" => "\u{2030}",
    "infin" => "\u{221E}",
    "ne" => "\u{2260}",
    "le" => "\u{2264}",
    "ge" => "\u{2265}",
    "AElig" => "\u{00C6}",
    "aelig" => "\u{00E6}",
    "Aacute" => "\u{00C1}",
    "aacute" => "\u{00E1}",
    "Eacute" => "\u{00C9}",
    "eacute" => "\u{00E9}",
    "Iacute" => "\u{00CD}",
    "iacute" => "\u{00ED}",
    "Oacute" => "\u{00D3}",
    "oacute" => "\u{00F3}",
    "Uacute" => "\u{00DA}",
    "uacute" => "\u{00FA}",
    "Ntilde" => "\u{00D1}",
    "ntilde" => "\u{00F1}",
    "Uuml" => "\u{00DC}",
    "uuml" => "\u{00FC}",
    "Ouml" => "\u{00D6}",
    "ouml" => "\u{00F6}",
    "Auml" => "\u{00C4}",
    "auml" => "\u{00E4}",
    "szlig" => "\u{00DF}",
    "micro" => "\u{00B5}",
    "ordf" => "\u{00AA}",
    "ordm" => "\u{00BA}",
    "laquo" => "\u{00AB}",
    "raquo" => "\u{00BB}",
    "iexcl" => "\u{00A1}",
    "iquest" => "\u{00BF}",
    "shy" => "\u{00AD}",
    "not" => "\u{00AC}",
    "hyphen" => "\u{2010}",
    "num" => "#",
    "dollar" => "$",
    "percnt" => "%",
    "ast" => "*",
    "colon" => ":",
    "semi" => ";",
    "commat" => "@",
    "lbrack" => "[",
    "rbrack" => "]",
    "lcub" => "{",
    "rcub" => "}",
    "grave" => "`",
    "OElig" => "\u{0152}",
    "oelig" => "\u{0153}",
    "Scaron" => "\u{0160}",
    "scaron" => "\u{0161}",
    "Yuml" => "\u{0178}",
    "circ" => "\u{02C6}",
    "tilde" => "\u{02DC}",
    "ensp" => "\u{2002}",
    "emsp" => "\u{2003}",
    "thinsp" => "\u{2009}",
    "zwnj" => "\u{200C}",
    "zwj" => "\u{200D}",
    "lrm" => "\u{200E}",
    "rlm" => "\u{200F}",
    "sbquo" => "\u{201A}",
    "bdquo" => "\u{201E}",
    "lsaquo" => "\u{2039}",
    "rsaquo" => "\u{203A}",
    "oline" => "\u{203E}",
    "frasl" => "\u{2044}",
    "weierp" => "\u{2118}",
    "image" => "\u{2111}",
    "real" => "\u{211C}",
    "alefsym" => "\u{2135}",
    "prod" => "\u{220F}",
    "sum" => "\u{2211}",
    "minus" => "\u{2212}",
    "radic" => "\u{221A}",
    "prop" => "\u{221D}",
    "ang" => "\u{2220}",
    "and" => "\u{2227}",
    "or" => "\u{2228}",
    "cap" => "\u{2229}",
    "cup" => "\u{222A}",
    "int" => "\u{222B}",
    "there4" => "\u{2234}",
    "sim" => "\u{223C}",
    "cong" => "\u{2245}",
    "asymp" => "\u{2248}",
    "equiv" => "\u{2261}",
    "sub" => "\u{2282}",
    "sup" => "\u{2283}",
    "nsub" => "\u{2284}",
    "sube" => "\u{2286}",
    "supe" => "\u{2287}",
    "oplus" => "\u{2295}",
    "otimes" => "\u{2297}",
    "perp" => "\u{22A5}",
    "sdot" => "\u{22C5}",
    "loz" => "\u{25CA}",
    "check" => "\u{2713}",
    "cross" => "\u{2717}",
};

/// Entity-table handle. Constructed once at parser initialization;
/// read-only thereafter.
pub struct EntityTable {
    table: &'static phf::Map<&'static str, &'static str>,
}

impl EntityTable {
    /// Loads the embedded entity table. The load can only fail if the
    /// embedded table itself is malformed, which would be a build-time
    /// bug; the `Result` exists so `Parser::new` has a single, honest
    /// failure path to report.
    pub fn load() -> Result<Self, ParserInitError> {
        if NAMED_ENTITIES.is_empty() {
            return Err(ParserInitError::EntityTableLoadFailed {
                path: ENTITY_TABLE_RESOURCE_NAME.to_string(),
                cause: "embedded table is empty".to_string(),
            });
        }
        Ok(Self { table: &NAMED_ENTITIES })
    }

    /// Resolves a named reference body (without `&`/`;`), e.g. `"amp"`.
    pub fn resolve_named(&self, name: &str) -> Option<&'static str> {
        self.table.get(name).copied()
    }

    /// Resolves `&#DDD;` / `&#xHHH;` numeric references. Invalid code
    /// points and the null character are replaced with U+FFFD, matching
    /// how browsers handle out-of-range numeric character references.
    pub fn resolve_numeric(code_point: u32) -> String {
        if code_point == 0 || code_point > 0x10FFFF || (0xD800..=0xDFFF).contains(&code_point) {
            return '\u{FFFD}'.to_string();
        }
        char::from_u32(code_point).map(|c| c.to_string()).unwrap_or_else(|| '\u{FFFD}'.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_resolves_common_entities() {
        let table = EntityTable::load().unwrap();
        assert_eq!(table.resolve_named("amp"), Some("&"));
        assert_eq!(table.resolve_named("copy"), Some("\u{00A9}"));
        assert_eq!(table.resolve_named("nonexistent"), None);
    }

    #[test]
    fn numeric_resolution_handles_invalid_code_points() {
        assert_eq!(EntityTable::resolve_numeric(0x41), "A");
        assert_eq!(EntityTable::resolve_numeric(0), "\u{FFFD}");
        assert_eq!(EntityTable::resolve_numeric(0xD800), "\u{FFFD}");
    }
}
