//! Money formatting for insight sentences and reports.
//!
//! Amounts are integer cents; output is currency symbol + number with a
//! locale-dependent thousands separator, e.g. `$1,234.56` or `€1.234,56`.

/// Currency and locale used when rendering amounts into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyFormat {
    symbol: &'static str,
    thousands_sep: char,
    decimal_sep: char,
}

impl MoneyFormat {
    pub fn new(currency: &str, locale: &str) -> Self {
        let (thousands_sep, decimal_sep) = locale_separators(locale);
        Self {
            symbol: currency_symbol(currency),
            thousands_sep,
            decimal_sep,
        }
    }

    /// Format without a sign; the caller decides how to phrase negatives.
    pub fn amount(&self, cents: i64) -> String {
        let abs_cents = cents.unsigned_abs();
        format!(
            "{}{}{}{:02}",
            self.symbol,
            format_with_thousands(abs_cents / 100, self.thousands_sep),
            self.decimal_sep,
            abs_cents % 100
        )
    }
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::new("USD", "en-US")
    }
}

fn locale_separators(locale: &str) -> (char, char) {
    match locale {
        "de-DE" | "de-AT" | "de-CH" | "fr-FR" | "fr-BE" | "fr-CA" | "es-ES" | "es-AR" | "it-IT"
        | "pt-BR" | "pt-PT" | "nl-NL" | "nl-BE" | "pl-PL" | "ru-RU" | "tr-TR" | "da-DK"
        | "nb-NO" | "sv-SE" | "fi-FI" => ('.', ','),
        _ => (',', '.'),
    }
}

fn format_with_thousands(n: u64, sep: char) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{00a3}",
        "JPY" => "\u{00a5}",
        "CAD" => "C$",
        "AUD" => "A$",
        "CHF" => "CHF\u{00a0}",
        "INR" => "\u{20b9}",
        "BRL" => "R$",
        "MXN" => "MX$",
        _ => "$",
    }
}
