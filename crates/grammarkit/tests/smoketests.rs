use grammarkit::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{Grammar, GrammarError},
    lr0::{LR0Automaton, StateID},
};
use std::{env, path::PathBuf};

fn grammar_path(name: &str) -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join(format!("tests/{}.grammar", name))
}

fn load(name: &str) -> Grammar {
    Grammar::from_file(grammar_path(name)).unwrap()
}

fn first_follow(g: &Grammar) -> (String, String) {
    let first_sets = FirstSets::new(g).unwrap();
    let follow_sets = FollowSets::new(g, &first_sets).unwrap();
    let sets = (
        first_sets.display(g).to_string(),
        follow_sets.display(g).to_string(),
    );
    sets
}

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name));
            eprintln!("grammar:\n{}", grammar);

            let (first, follow) = first_follow(&grammar);
            eprintln!("{}\n{}", first, follow);

            let lr0 = LR0Automaton::build(&grammar).unwrap();
            eprintln!("LR(0) states:\n---\n{}", lr0.display());
            assert!(lr0.accepting_state().is_some());
        }
    )*};
}

define_tests! {
    original,
    example_a,
    balanced,
    expr,
    arithmetic,
    mutual,
}

#[test]
fn original_first_follow() {
    let (first, follow) = first_follow(&load("original"));
    assert_eq!(
        first,
        "\
FIRST(S) = { a }
FIRST(B) = { c }
FIRST(C) = { b, ε }
FIRST(D) = { f, g, ε }
FIRST(E) = { g, ε }
FIRST(F) = { f, ε }
"
    );
    assert_eq!(
        follow,
        "\
FOLLOW(S) = { $ }
FOLLOW(B) = { f, g, h }
FOLLOW(C) = { f, g, h }
FOLLOW(D) = { h }
FOLLOW(E) = { f, h }
FOLLOW(F) = { h }
"
    );
}

#[test]
fn example_a_first_follow() {
    let (first, follow) = first_follow(&load("example_a"));
    assert_eq!(first, "FIRST(S) = { a }\nFIRST(B) = { b, ε }\n");
    assert_eq!(follow, "FOLLOW(S) = { $ }\nFOLLOW(B) = { c }\n");
}

#[test]
fn expr_follow() {
    let (_, follow) = first_follow(&load("expr"));
    assert_eq!(
        follow,
        "\
FOLLOW(E) = { $, rparen }
FOLLOW(E') = { $, rparen }
FOLLOW(T) = { $, plus, rparen }
FOLLOW(T') = { $, plus, rparen }
FOLLOW(F) = { $, plus, rparen, star }
"
    );
}

#[test]
fn mutual_recursion_first() {
    let (first, _) = first_follow(&load("mutual"));
    assert_eq!(first, "FIRST(A) = { x, y }\nFIRST(B) = { x, y }\n");
}

#[test]
fn balanced_lr0() {
    let grammar = load("balanced");
    let lr0 = LR0Automaton::build(&grammar).unwrap();
    let g = lr0.grammar();
    let a = g.symbol("a").unwrap();
    let b = g.symbol("b").unwrap();
    let s = g.symbol("S").unwrap();

    let i1 = lr0.goto(StateID::START, a).unwrap();
    assert_eq!(lr0.goto(i1, b), None);
    let reduce = lr0.goto(lr0.goto(i1, s).unwrap(), b).unwrap();
    let items: Vec<_> = lr0
        .reduce_ready_items(reduce)
        .iter()
        .map(|item| item.display(g).to_string())
        .collect();
    assert_eq!(items, ["S -> a S b ."]);

    assert_eq!(
        lr0.goto(StateID::START, s),
        lr0.accepting_state(),
        "GOTO(I0, S) is the accepting state"
    );
}

#[test]
fn arithmetic_start_symbol() {
    let lr0 = LR0Automaton::build(&load("arithmetic")).unwrap();
    let g = lr0.grammar();
    assert_eq!(g.nonterminal_name(g.start_symbol), "Expr");
    assert_eq!(
        g.nonterminal_name(g.accept_symbol().unwrap()),
        "Expr'",
        "augmented start symbol"
    );
}

#[test]
fn undefined_nonterminal() {
    let err = Grammar::from_file(grammar_path("undefined")).unwrap_err();
    match err {
        GrammarError::UndefinedNonterminal { name, production } => {
            assert_eq!(name, "D");
            assert_eq!(production, "S -> a D");
        }
        err => panic!("unexpected error: {}", err),
    }
}

#[test]
fn missing_file() {
    let err = Grammar::from_file(grammar_path("no_such_grammar")).unwrap_err();
    assert!(matches!(err, GrammarError::IO(..)));
}
