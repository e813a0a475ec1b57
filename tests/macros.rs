// Shared test helpers, textually included by each test file.

#[allow(unused_macros)]
macro_rules! findall {
    ($re:expr, $text:expr) => {{
        $re.find_iter($text)
            .map(|m| {
                let m = m.unwrap();
                (m.index(), m.index() + m.len())
            })
            .collect::<Vec<(usize, usize)>>()
    }};
}

#[allow(unused_macros)]
macro_rules! first_span {
    ($re:expr, $text:expr) => {{
        $re.find($text)
            .unwrap()
            .map(|m| (m.index(), m.index() + m.len()))
    }};
}
