use indicatif::ProgressStyle;

pub fn extraction_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent:>3}% {pos}/{len} frames [{elapsed_precise}<{eta_precise}]",
    )
    .expect("invalid extraction bar template")
}

pub fn extraction_spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan.bold} [{elapsed_precise}] frames {pos}")
        .expect("invalid extraction spinner template")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}
