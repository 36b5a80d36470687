/// One run of a file name under natural ordering: digits compare by value,
/// text compares case-insensitively. Numeric runs order before text runs
/// when the kinds differ at the same position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Num(u64),
    Text(String),
}

/// Split a file name into its natural-ordering key, so that `file2` sorts
/// before `file10`.
#[must_use]
pub fn natural_key(name: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut run = String::new();
    let mut run_is_digits = false;

    for ch in name.chars() {
        let is_digit = ch.is_ascii_digit();
        if !run.is_empty() && is_digit != run_is_digits {
            segments.push(finish_run(&run, run_is_digits));
            run.clear();
        }
        run_is_digits = is_digit;
        run.push(ch);
    }
    if !run.is_empty() {
        segments.push(finish_run(&run, run_is_digits));
    }
    segments
}

fn finish_run(run: &str, is_digits: bool) -> Segment {
    if is_digits {
        // Absurdly long digit runs fall back to text comparison.
        run.parse::<u64>()
            .map(Segment::Num)
            .unwrap_or_else(|_| Segment::Text(run.to_string()))
    } else {
        Segment::Text(run.to_lowercase())
    }
}
