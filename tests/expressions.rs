use std::cell::Cell;
use std::rc::Rc;

use zest::expr::ExpressionCache;
use zest::{effect, object, tick, Bindings, Error, Evaluator, Function, Ref, Value};

fn eval(source: &str, bindings: &Bindings) -> Value {
	Evaluator::default().evaluate(source, bindings).unwrap()
}

#[test]
fn evaluates_the_template_subset() {
	let bindings = Bindings::new(object! {
		name: "zest",
		items: vec![1, 2, 3, 4],
		user: object! { profile: () },
	});

	assert_eq!(eval("1 + 2 * 3 - 4 / 2", &bindings), Value::from(5));
	assert_eq!(eval("'v' + 1 + 2", &bindings), Value::from("v12"));
	assert_eq!(eval("name.toUpperCase() + '!'", &bindings), Value::from("ZEST!"));
	assert_eq!(eval("items.filter(i => i % 2 === 0).map(i => i * 10).join(',')", &bindings), Value::from("20,40"));
	assert_eq!(eval("items.reduce((sum, i) => sum + i, 0)", &bindings), Value::from(10));
	assert_eq!(eval("user.profile?.name ?? 'anonymous'", &bindings), Value::from("anonymous"));
	assert_eq!(eval("items.length > 3 ? 'many' : 'few'", &bindings), Value::from("many"));
	assert_eq!(eval("typeof name", &bindings), Value::from("string"));
	assert_eq!(eval("Number('4') + String(2)", &bindings), Value::from("42"));
	assert_eq!(eval("{ a: 1, 'b c': [name] }['b c'][0]", &bindings), Value::from("zest"));
	assert_eq!(eval("1 == '1' && 1 !== '1' && null == undefined", &bindings), Value::from(true));
}

#[test]
fn statements_and_assignments_write_back() {
	let count = Ref::new(1);
	let state = object! { total: 0, tags: Vec::<Value>::new() };
	let bindings = Bindings::new(object! { count: count.clone(), state: state.clone() });
	let evaluator = Evaluator::default();

	evaluator
		.evaluate("count++; state.total += count * 2; state.tags.push('a')", &bindings)
		.unwrap();
	assert_eq!(count.get_untracked(), Value::from(2));
	assert_eq!(state.get("total"), Some(Value::from(4)));

	// assigning to a ref-bound name updates the ref instead of rebinding
	evaluator.evaluate("count = 10", &bindings).unwrap();
	assert_eq!(count.get_untracked(), Value::from(10));
	assert!(matches!(bindings.lookup("count"), Some(Value::Ref(_))));

	evaluator.assign("state.total", &bindings, Value::from(1)).unwrap();
	assert_eq!(state.get("total"), Some(Value::from(1)));
	assert_eq!(
		evaluator.assign("count + 1", &bindings, Value::from(1)),
		Err(Error::Assign("count + 1".into()))
	);
}

#[test]
fn calls_functions_in_scope() {
	let calls = Rc::new(Cell::new(0));
	let greet = Function::named("greet", {
		let calls = calls.clone();
		move |args| {
			calls.set(calls.get() + 1);
			Ok(Value::from(format!("hi {}", args.first().cloned().unwrap_or_default())))
		}
	});
	let bindings = Bindings::new(object! { greet: greet, who: Ref::new("bob") });

	assert_eq!(eval("greet(who)", &bindings), Value::from("hi bob"));
	assert_eq!(calls.get(), 1);
	assert!(matches!(
		Evaluator::default().evaluate("who()", &bindings),
		Err(Error::Type(_))
	));
}

#[test]
fn unknown_names_fail_at_evaluation() {
	let evaluator = Evaluator::default();
	let bindings = Bindings::new(object! {});
	let program = evaluator.compile("missing + 1", &bindings).unwrap();
	assert_eq!(program.run(&bindings), Err(Error::Reference("missing".into())));
}

#[test]
fn only_referenced_names_are_tracked() {
	let (used, unused) = (Ref::new(1), Ref::new(1));
	let bindings = Bindings::new(object! { used: used.clone(), unused: unused.clone() });
	let evaluator = Rc::new(Evaluator::default());
	let runs = Rc::new(Cell::new(0));

	let _watch = effect!((evaluator, bindings, runs) => {
		evaluator.evaluate("used * 2", &bindings).unwrap();
		runs.set(runs.get() + 1);
	});

	unused.set(2);
	tick();
	assert_eq!(runs.get(), 1);

	used.set(2);
	tick();
	assert_eq!(runs.get(), 2);
}

#[test]
fn same_source_in_different_scopes_compiles_separately() {
	let evaluator = Evaluator::default();
	let outer = Bindings::new(object! { items: vec!["a", "b"] });
	let inner = outer.child(object! { index: 1 });

	assert!(matches!(evaluator.evaluate("index", &outer), Err(Error::Reference(_))));
	assert_eq!(evaluator.evaluate("items[index]", &inner).unwrap(), Value::from("b"));
	assert_eq!(evaluator.evaluate("index", &inner).unwrap(), Value::from(1));
	assert_eq!(evaluator.cache().len(), 3);
}

#[test]
fn cache_evicts_the_oldest_entry() {
	let cache = ExpressionCache::new(2);
	let names: Vec<Rc<str>> = vec![Rc::from("a")];

	let first = cache.get_or_compile("a + 1", &names).unwrap();
	cache.get_or_compile("a + 2", &names).unwrap();
	cache.get_or_compile("a + 3", &names).unwrap();
	assert_eq!(cache.len(), 2);

	let again = cache.get_or_compile("a + 1", &names).unwrap();
	assert!(!Rc::ptr_eq(&first, &again));
}

#[test]
fn deeply_nested_sources_are_syntax_errors() {
	let bindings = Bindings::new(object! { a: 1 });
	let evaluator = Evaluator::default();

	let parens = format!("{}a{}", "(".repeat(100_000), ")".repeat(100_000));
	assert!(matches!(evaluator.evaluate(&parens, &bindings), Err(Error::Syntax { .. })));

	let negations = format!("{}a", "!".repeat(100_000));
	assert!(matches!(evaluator.evaluate(&negations, &bindings), Err(Error::Syntax { .. })));

	let nested = format!("{}a{}", "[".repeat(50), "]".repeat(50));
	assert_eq!(evaluator.evaluate(&format!("{}.length", nested), &bindings).unwrap(), Value::from(1));
}
