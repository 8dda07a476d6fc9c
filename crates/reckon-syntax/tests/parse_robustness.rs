use proptest::prelude::*;
use reckon_eval::Value;
use reckon_syntax::{parse, print};

const FRAGMENTS: [&str; 18] = [
    "(", ")", ",", "@avail", "if", "null", "${a}", "${b}", "int{1}", "int{-7}", "double{0.5}",
    "bool{true}", "text{x}", " + ", " / ", " >= ", " && ", "-",
];

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn arbitrary_text_never_panics(source in "\\PC{0,64}") {
        let _ = parse::<Value>(&source);
    }

    #[test]
    fn fragment_soup_prints_stably(picks in prop::collection::vec(0..FRAGMENTS.len(), 1..24)) {
        let source: String = picks.iter().map(|&i| FRAGMENTS[i]).collect();
        if let Ok(expr) = parse::<Value>(&source) {
            let printed = print(&expr);
            let reparsed = parse::<Value>(&printed).expect("printed text should parse");
            prop_assert_eq!(print(&reparsed), printed);
        }
    }
}
