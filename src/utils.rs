/// English ordinal form: `1st`, `2nd`, `3rd`, `11th`, `22nd`.
pub fn ordinal(num: usize) -> String {
    let suffix = match (num % 10, num % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    };
    format!("{num}{suffix}")
}
