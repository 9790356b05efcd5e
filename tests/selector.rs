use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::{select, Index};
use rulesieve::{
    Bundle, CandidateSet, Config, Error, Rule, RuleCorpus, RuleIndex, RuleRef, Selector, Template,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn names(selected: &[RuleRef]) -> Vec<String> {
    selected.iter().map(|r| r.qualified_name()).collect()
}

fn query(tokens: &[&str]) -> CandidateSet {
    tokens.iter().copied().collect()
}

fn requirements(args: &str, body: &str) -> Vec<Vec<String>> {
    Template::parse(args, body)
        .unwrap()
        .requirements(&Config::default())
        .unwrap()
        .into_iter()
        .map(|set| set.iter().map(|t| t.to_string()).collect())
        .collect()
}

#[test]
fn conjunctions_and_alternatives() {
    init();
    let corpus: RuleCorpus = vec![
        Rule::single("a", "", "foo(bar)").unwrap(),
        Rule::single("b", "", "any_of!(foo, baz)").unwrap(),
    ]
    .into_iter()
    .collect();
    let selector = Selector::new(corpus);
    assert_eq!(names(&selector.select_for(&query(&["foo"]))), ["b"]);
    assert_eq!(names(&selector.select_for(&query(&["foo", "bar"]))), ["a", "b"]);
    assert_eq!(names(&selector.select_for(&query(&["baz"]))), ["b"]);
    assert!(selector.select_for(&query(&[])).is_empty());
}

#[test]
fn empty_requirement_always_selected() {
    init();
    let corpus: RuleCorpus = std::iter::once(Rule::single("c", "$x:expr", "$x").unwrap()).collect();
    let selector = Selector::new(corpus);
    assert_eq!(names(&selector.select_for(&query(&[]))), ["c"]);
    assert_eq!(names(&selector.select_for(&query(&["anything"]))), ["c"]);
}

#[test]
fn empty_corpus_selects_nothing() {
    let selector = Selector::new(RuleCorpus::new());
    assert!(selector.select_for(&query(&["a", "b"])).is_empty());
    assert!(selector.index().trie().is_empty());
}

#[test]
fn extraction_table() {
    let table: &[(&str, &str, &[&[&str]])] = &[
        ("", "a + b", &[&["+", "a", "b"]]),
        ("", "x = 5", &[&["=", "x"]]),
        ("", "a > 0 && b < 10", &[&["&&", "<", ">", "a", "b"]]),
        ("$a:expr", "$a += 1", &[&["+="]]),
        ("$a:expr, $b:expr", "$a << $b >= 1", &[&["<<", ">="]]),
        ("$a:expr", "!$a.is_empty()", &[&["!", "is_empty"]]),
        ("$p:expr", "unsafe { *$p }", &[&["*x"]]),
        ("$t:ty", "<$t>::default()", &[&["default"]]),
        ("$t:ty", "Vec::<$t>::with_capacity(0)", &[&["Vec", "with_capacity"]]),
        ("$f:expr", "$f.await?", &[&["?", "await"]]),
        ("$x:expr", "$x as usize", &[&["as", "usize"]]),
        ("$v:expr", "&$v[1..]", &[&["&x", "..", "[]"]]),
        ("$s:expr", "format!(\"{}\", $s.name)", &[&["format"]]),
        ("$a:pat, $e:expr", "matches!($e, $a)", &[&["matches"]]),
        (
            "$o:expr",
            "match $o { Some(x) => x, None => any_of!(0, Default::default()) }",
            &[&["Default", "Some", "default", "x"], &["Some", "x"]],
        ),
        (
            "$v:ident, $e:expr",
            "let mut $v = Vec::new(); $v.extend($e);",
            &[&["Vec", "extend", "new"]],
        ),
    ];
    for &(args, body, expected) in table {
        let expected: Vec<Vec<String>> = expected
            .iter()
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .collect();
        assert_eq!(requirements(args, body), expected, "{}", body);
    }
}

#[test]
fn sites_cover_rules() {
    init();
    let bundle = Bundle::parse(
        "lints",
        r#"
        macro_rules! len_zero {
            ($s:expr) => { $s.len() == 0 };
            ($s:expr) => { $s.len() < 1 };
        }
        macro_rules! manual_swap {
            ($a:expr, $b:expr) => { let t = $a; $a = $b; $b = t; };
        }
        mod iter {
            macro_rules! map_unwrap_or {
                ($i:expr, $f:expr, $d:expr) => { $i.map($f).unwrap_or($d) }
            }
        }
        "#,
    )
    .unwrap();
    let selector = Selector::new(std::iter::once(bundle).collect());

    let file: syn::File = syn::parse_str(
        r#"
        fn shuffle(v: &mut Vec<u32>, i: usize, j: usize) {
            if v.len() < 1 {
                return;
            }
            let t = v[i];
            v[i] = v[j];
            v[j] = t;
        }
        "#,
    )
    .unwrap();
    assert_eq!(
        names(&selector.select_candidates(&file)),
        ["lints::len_zero", "lints::manual_swap"]
    );

    let item: syn::ItemFn = syn::parse_str(
        "fn lookup(m: &Map) -> u32 { m.get(1).map(|v| v * 2).unwrap_or(0) }",
    )
    .unwrap();
    let selected = selector.select_candidates(&item);
    assert_eq!(names(&selected), ["lints::iter::map_unwrap_or"]);
    let bundle = selected[0].bundle().unwrap();
    assert_eq!(bundle.name(), "iter");
    let parent = bundle
        .parent()
        .and_then(|b| selector.corpus().bundle(b))
        .unwrap();
    assert_eq!(parent.name(), "lints");
}

#[test]
fn any_of_stands_for_an_expression() {
    let err = Bundle::parse(
        "lints",
        "macro_rules! neg_cmp { ($a:expr, $b:expr) => { !($a any_of!(<, >) $b) } }",
    )
    .unwrap_err();
    assert!(matches!(err, Error::InRule { ref rule, .. } if rule == "neg_cmp"));
}

#[test]
fn signatures_are_not_sites() {
    let corpus: RuleCorpus =
        std::iter::once(Rule::single("string_len", "$s:expr", "String::len(&$s)").unwrap())
            .collect();
    let selector = Selector::new(corpus);
    let item: syn::Item = syn::parse_str("fn f(len: String) -> usize { len.capacity() }").unwrap();
    assert!(selector.select_candidates(&item).is_empty());
}

#[test]
fn local_functions_in_statement_templates() {
    init();
    let corpus: RuleCorpus = std::iter::once(
        Rule::single("local_helper", "$e:expr", "fn helper(v: Widget) -> u8 { 0 } helper($e);").unwrap(),
    )
    .collect();
    let selector = Selector::new(corpus);
    let item: syn::Item =
        syn::parse_str("fn outer() { fn helper(v: Widget) -> u8 { 0 } helper(x); }").unwrap();
    assert_eq!(names(&selector.select_candidates(&item)), ["local_helper"]);
}

#[test]
fn any_of_in_pattern_position() {
    init();
    let corpus: RuleCorpus = std::iter::once(
        Rule::single("none_or_zero", "$o:expr", "match $o { any_of!(None, Ok(0)) => 1, _ => 2 }").unwrap(),
    )
    .collect();
    let selector = Selector::new(corpus);
    assert_eq!(
        requirements("$o:expr", "match $o { any_of!(None, Ok(0)) => 1, _ => 2 }"),
        [vec![], vec!["Ok".to_owned()]]
    );
    let site: syn::Expr = syn::parse_str("match o { None => 1, _ => 2 }").unwrap();
    assert_eq!(names(&selector.select_candidates(&site)), ["none_or_zero"]);
}

#[test]
fn filtered_corpus() {
    let mut corpus: RuleCorpus = std::iter::once(
        Bundle::new("style")
            .with(Rule::single("double_neg", "$a:expr", "!!$a").unwrap())
            .with(Bundle::new("perf").with(Rule::single("clone_clone", "$a:expr", "$a.clone().clone()").unwrap())),
    )
    .collect();
    corpus.retain(|name| !name.starts_with("style::perf"));
    let selector = Selector::new(corpus);
    let site: syn::Expr = syn::parse_str("!!x.clone().clone()").unwrap();
    assert_eq!(names(&selector.select_candidates(&site)), ["style::double_neg"]);
}

#[test]
fn literals_when_enabled() {
    let corpus = || -> RuleCorpus {
        std::iter::once(Rule::single("mod_two", "$a:expr", "$a % 2 == 0").unwrap()).collect()
    };
    let site: syn::Expr = syn::parse_str("n % 3 == 0").unwrap();
    let plain = Selector::new(corpus());
    assert_eq!(plain.select_candidates(&site).len(), 1);
    let exact = Selector::with_config(
        corpus(),
        Config {
            int_literals: true,
            ..Config::default()
        },
    );
    assert!(exact.select_candidates(&site).is_empty());
    let site: syn::Expr = syn::parse_str("n % 2 == 0").unwrap();
    assert_eq!(exact.select_candidates(&site).len(), 1);
}

#[test]
fn shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Selector>();
    assert_send_sync::<RuleIndex>();
    assert_send_sync::<RuleCorpus>();

    init();
    let corpus: RuleCorpus = (0..50)
        .map(|i| Rule::single(format!("r{}", i), "$a:expr", &format!("$a.m{}()", i)).unwrap())
        .collect();
    let selector = Arc::new(Selector::new(corpus));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let selector = Arc::clone(&selector);
            std::thread::spawn(move || {
                let site: syn::Expr = syn::parse_str(&format!("x.m{}().m{}()", t, t + 10)).unwrap();
                let selected: Vec<usize> = selector
                    .select_candidates(&site)
                    .iter()
                    .map(|r| r.id().index())
                    .collect();
                (t, selected)
            })
        })
        .collect();
    for h in handles {
        let (t, selected) = h.join().unwrap();
        assert_eq!(selected, [t, t + 10]);
    }
}

struct Case {
    args: &'static str,
    body: &'static str,
    /// Concrete forms a site may take, one per `any_of!` choice.
    instances: &'static [&'static str],
    stmt: bool,
}

const CASES: &[Case] = &[
    Case {
        args: "$a:expr",
        body: "$a.len() == 0",
        instances: &["$a.len() == 0"],
        stmt: false,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "$a + any_of!($b, $b * 2, -$b)",
        instances: &["$a + $b", "$a + $b * 2", "$a + -$b"],
        stmt: false,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "std::mem::replace(&mut $a, any_of!(Vec::new(), vec![$b]))",
        instances: &[
            "std::mem::replace(&mut $a, Vec::new())",
            "std::mem::replace(&mut $a, vec![$b])",
        ],
        stmt: false,
    },
    Case {
        args: "$a:expr",
        body: "-$a as u32",
        instances: &["-$a as u32"],
        stmt: false,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "$a[$b..=any_of!($b + 1, $b - 1)].iter()",
        instances: &["$a[$b..=$b + 1].iter()", "$a[$b..=$b - 1].iter()"],
        stmt: false,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "let v = $a.get(&$b); v.is_some();",
        instances: &["let v = $a.get(&$b); v.is_some();"],
        stmt: true,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "out.write_all(&$a)?; any_of!(out.flush(), $b.flush())?;",
        instances: &[
            "out.write_all(&$a)?; out.flush()?;",
            "out.write_all(&$a)?; $b.flush()?;",
        ],
        stmt: true,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "fn helper(v: Widget) -> u8 { $a.len() as u8 } helper($b);",
        instances: &["fn helper(v: Widget) -> u8 { $a.len() as u8 } helper($b);"],
        stmt: true,
    },
    Case {
        args: "$a:expr, $b:expr",
        body: "match ($a) { any_of!(None, Some(0)) => $b, _ => 1 }",
        instances: &[
            "match ($a) { None => $b, _ => 1 }",
            "match ($a) { Some(0) => $b, _ => 1 }",
        ],
        stmt: false,
    },
    Case {
        args: "$a:expr",
        body: "$a as any_of!(u8, i64)",
        instances: &["$a as u8", "$a as i64"],
        stmt: false,
    },
];

const OPERANDS: &[&str] = &[
    "x",
    "foo.bar",
    "(a + b)",
    "vec![1, 2]",
    "s.len()",
    "*p",
    "f(x)?",
    "S { f: 1 }",
    "Default::default()",
];

const EXPR_SITES: &[&str] = &[
    "fn f() { let _ = @; }",
    "fn f() -> u32 { g(@, y) }",
    "impl S { fn m(&self) { let v = [@]; } }",
    "fn f() { m!(@); }",
    "fn f() { m!(@; 1) }",
];

const STMT_SITES: &[&str] = &[
    "fn f() { @ }",
    "fn f() { x(); @ y(); }",
    "fn f() { m! { @ } }",
];

static SELECTOR: Lazy<Selector> = Lazy::new(|| {
    let corpus = CASES
        .iter()
        .enumerate()
        .map(|(i, c)| Rule::single(format!("case{}", i), c.args, c.body).unwrap())
        .collect();
    Selector::new(corpus)
});

proptest! {
    #[test]
    fn instances_of_a_rule_select_it(
        case in 0..CASES.len(),
        choice in any::<Index>(),
        site in any::<Index>(),
        a in select(OPERANDS),
        b in select(OPERANDS),
    ) {
        let c = &CASES[case];
        let instance = choice
            .get(c.instances)
            .replace("$a", a)
            .replace("$b", b);
        let sites = if c.stmt { STMT_SITES } else { EXPR_SITES };
        let src = site.get(sites).replace('@', &instance);
        let file: syn::File = syn::parse_str(&src)
            .map_err(|e| TestCaseError::fail(format!("{}: {}", src, e)))?;
        let selected: BTreeSet<usize> = SELECTOR
            .select_candidates(&file)
            .iter()
            .map(|r| r.id().index())
            .collect();
        prop_assert!(selected.contains(&case), "{} not selected for {}", c.body, src);
    }
}
