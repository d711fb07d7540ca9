// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use picname::config::{Delimiter, Settings};
use picname::normalize::normalize;

#[derive(Debug, Arbitrary)]
struct Input {
    filename: String,
    delimiter: u8,
    capitalize: bool,
}

fuzz_target!(|input: Input| {
    let settings = Settings {
        delimiter: Delimiter::ALL[input.delimiter as usize % Delimiter::ALL.len()],
        capitalize_words: input.capitalize,
        ..Settings::default()
    };

    let Ok(once) = normalize(&input.filename, &settings) else {
        return;
    };

    let twice = normalize(&once, &settings).expect("normalized name must stay valid");
    assert_eq!(once, twice);
});
