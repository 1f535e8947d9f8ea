//! Bank identification
//!
//! Maps a message's sender address and subject line to a bank label using a
//! static ordered signature table. Pure and stateless: identical inputs
//! always yield the identical label.

/// One entry in the signature table
///
/// `sender_fragment` matches anywhere in the lowercased sender address
/// (usually the alert domain). `subject_keyword`, when set, is an additional
/// hint checked against the lowercased subject; it only applies when the
/// sender gave no match.
struct BankSignature {
    sender_fragment: &'static str,
    subject_keyword: Option<&'static str>,
    label: &'static str,
}

/// Label used when no signature matches
pub const UNKNOWN_BANK: &str = "unknown";

/// Ordered signature table. More specific fragments come first so that e.g.
/// `alerts.sbi.co.in` wins over a bare `sbi` subject hint.
const SIGNATURES: &[BankSignature] = &[
    BankSignature {
        sender_fragment: "alerts.sbi.co.in",
        subject_keyword: Some("sbi"),
        label: "sbi",
    },
    BankSignature {
        sender_fragment: "sbi.co.in",
        subject_keyword: None,
        label: "sbi",
    },
    BankSignature {
        sender_fragment: "hdfcbank.net",
        subject_keyword: Some("hdfc"),
        label: "hdfc",
    },
    BankSignature {
        sender_fragment: "hdfcbank.com",
        subject_keyword: None,
        label: "hdfc",
    },
    BankSignature {
        sender_fragment: "icicibank.com",
        subject_keyword: Some("icici"),
        label: "icici",
    },
    BankSignature {
        sender_fragment: "axisbank.com",
        subject_keyword: Some("axis bank"),
        label: "axis",
    },
    BankSignature {
        sender_fragment: "kotak.com",
        subject_keyword: Some("kotak"),
        label: "kotak",
    },
    BankSignature {
        sender_fragment: "pnb.co.in",
        subject_keyword: None,
        label: "pnb",
    },
    BankSignature {
        sender_fragment: "chase.com",
        subject_keyword: None,
        label: "chase",
    },
    BankSignature {
        sender_fragment: "bankofamerica.com",
        subject_keyword: None,
        label: "bofa",
    },
    BankSignature {
        sender_fragment: "americanexpress.com",
        subject_keyword: Some("american express"),
        label: "amex",
    },
];

/// Identify the bank behind a transaction alert
///
/// Sender matches take precedence over subject hints; the first matching
/// table entry wins. Returns [`UNKNOWN_BANK`] when nothing matches.
pub fn identify_bank(sender: &str, subject: &str) -> &'static str {
    let sender = sender.to_lowercase();
    let subject = subject.to_lowercase();

    for sig in SIGNATURES {
        if sender.contains(sig.sender_fragment) {
            return sig.label;
        }
    }

    // No sender match; fall back to subject hints in table order
    for sig in SIGNATURES {
        if let Some(keyword) = sig.subject_keyword {
            if subject.contains(keyword) {
                return sig.label;
            }
        }
    }

    UNKNOWN_BANK
}
