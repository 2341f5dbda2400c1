use std::cell::{Cell, RefCell};
use std::rc::Rc;

use zest::dom::{Event, HostEvent, HostNode, Node};
use zest::{object, reactive, tick, App, Config, Function, Hook, Object, Phase, Ref, Value};

fn mount(html: &str, setup: Object) -> (App, Node) {
	mount_with(App::new(), html, setup)
}

fn mount_with(app: App, html: &str, setup: Object) -> (App, Node) {
	let document = Node::parse(html);
	let app = app.with_document(document.clone());
	app.mount("#app", move || setup).unwrap();
	let root = document.query_selector("#app").unwrap();
	(app, root)
}

fn texts(root: &Node, selector: &str) -> Vec<String> {
	root.query_selector_all(selector)
		.iter()
		.map(Node::text_content)
		.collect()
}

fn count_effect_runs(app: &App) -> Rc<Cell<usize>> {
	let runs = Rc::new(Cell::new(0));
	app.hooks().add_hook(Hook::before_effect({
		let runs = runs.clone();
		move |_| {
			runs.set(runs.get() + 1);
			Ok(())
		}
	}));
	runs
}

#[test]
fn counter_interpolation_updates_after_a_tick() {
	let count = Ref::new(0);
	let (_app, root) = mount(r#"<div id="app">{{ count }}</div>"#, object! { count: count.clone() });
	assert_eq!(root.text_content(), "0");

	count.set(42);
	assert_eq!(root.text_content(), "0");
	tick();
	assert_eq!(root.text_content(), "42");
}

#[test]
fn interpolation_mixes_text_and_expressions() {
	let state = reactive(object! { first: "Ada", last: "Lovelace", missing: () });
	let (_app, root) = mount(
		r#"<p id="app">Hello {{ state.first }} {{ state.last.toUpperCase() }}!{{ state.missing }}</p>"#,
		object! { state: state.clone() },
	);
	assert_eq!(root.text_content(), "Hello Ada LOVELACE!");

	state.as_object().unwrap().set("first", "Grace");
	tick();
	assert_eq!(root.text_content(), "Hello Grace LOVELACE!");
}

#[test]
fn per_item_buttons_only_touch_their_item() {
	let items = Ref::new(vec![1, 2, 3]);
	let app = App::new();
	let runs = count_effect_runs(&app);
	let (_app, root) = mount_with(
		app,
		r#"<ul id="app"><li z-for="item in items"><span>{{ item }}</span><button @click="item.value++">+</button></li></ul>"#,
		object! { items: items.clone() },
	);
	assert_eq!(texts(&root, "span"), ["1", "2", "3"]);

	let spans = root.query_selector_all("span");
	runs.set(0);
	root.query_selector_all("button")[0].click();
	tick();

	assert_eq!(texts(&root, "span"), ["2", "2", "3"]);
	assert_eq!(runs.get(), 1);
	assert_eq!(root.query_selector_all("span"), spans);
}

#[test]
fn conditional_chain_renders_exactly_one_branch() {
	let mode = Ref::new("a");
	let count = Ref::new(0);
	let app = App::new();
	let runs = count_effect_runs(&app);
	let (_app, root) = mount_with(
		app,
		r#"<div id="app">
			<p z-if="mode === 'a'">A {{ count }}</p>
			<p z-else-if="mode === 'b'">B</p>
			<p z-else>C</p>
		</div>"#,
		object! { mode: mode.clone(), count: count.clone() },
	);
	assert_eq!(texts(&root, "p"), ["A 0"]);

	mode.set("b");
	tick();
	assert_eq!(texts(&root, "p"), ["B"]);

	// the hidden branch's effects are gone
	runs.set(0);
	count.set(1);
	tick();
	assert_eq!(runs.get(), 0);
	assert_eq!(count.dep().subscriber_count(), 0);

	mode.set("c");
	tick();
	assert_eq!(texts(&root, "p"), ["C"]);

	mode.set("a");
	tick();
	assert_eq!(texts(&root, "p"), ["A 1"]);

	// same selection, no re-render
	let rendered = root.query_selector("p").unwrap();
	mode.set("a ");
	mode.set("a");
	tick();
	assert_eq!(root.query_selector("p").unwrap(), rendered);
}

#[test]
fn conditional_takes_priority_over_for() {
	let show = Ref::new(false);
	let (_app, root) = mount(
		r#"<ul id="app"><li z-if="show" z-for="n in [1, 2]">{{ n }}</li></ul>"#,
		object! { show: show.clone() },
	);
	assert!(texts(&root, "li").is_empty());

	show.set(true);
	tick();
	assert_eq!(texts(&root, "li"), ["1", "2"]);
}

#[test]
fn orphan_else_is_stripped_and_rendered() {
	let (_app, root) = mount(r#"<div id="app"><p z-else>always</p></div>"#, object! {});
	let p = root.query_selector("p").unwrap();
	assert!(!p.has_attribute("z-else"));
	assert_eq!(p.text_content(), "always");
}

#[test]
fn keyed_lists_reuse_nodes() {
	let todos = reactive(vec![
		object! { id: 1, text: "one" },
		object! { id: 2, text: "two" },
		object! { id: 3, text: "three" },
	])
	.as_array()
	.unwrap();

	let (_app, root) = mount(
		r#"<ul id="app"><li z-for="(todo, i) of todos" :key="todo.id">{{ i }}:{{ todo.text }}</li></ul>"#,
		object! { todos: todos.clone() },
	);
	assert_eq!(texts(&root, "li"), ["0:one", "1:two", "2:three"]);
	let before = root.query_selector_all("li");

	todos.reverse();
	tick();
	assert_eq!(texts(&root, "li"), ["0:three", "1:two", "2:one"]);
	let after = root.query_selector_all("li");
	assert_eq!(after, before.iter().rev().cloned().collect::<Vec<_>>());

	todos.splice(1, 1, std::iter::empty());
	todos.push(object! { id: 4, text: "four" });
	tick();
	assert_eq!(texts(&root, "li"), ["0:three", "1:one", "2:four"]);
	let last = root.query_selector_all("li");
	assert_eq!(last[0], before[2]);
	assert_eq!(last[1], before[0]);

	todos.get(0).as_object().unwrap().set("text", "THREE");
	tick();
	assert_eq!(texts(&root, "li")[0], "0:THREE");
}

#[test]
fn list_items_keep_their_position_among_siblings() {
	let items = Ref::new(vec!["b"]);
	let (_app, root) = mount(
		r#"<ul id="app"><li>first</li><li z-for="item in items">{{ item }}</li><li>last</li></ul>"#,
		object! { items: items.clone() },
	);
	assert_eq!(texts(&root, "li"), ["first", "b", "last"]);

	items.set(vec!["x", "y"]);
	tick();
	assert_eq!(texts(&root, "li"), ["first", "x", "y", "last"]);

	items.set(Vec::<Value>::new());
	tick();
	assert_eq!(texts(&root, "li"), ["first", "last"]);
}

#[test]
fn duplicate_keys_keep_the_later_item() {
	let items = Ref::new(vec![object! { id: 1, text: "a" }, object! { id: 1, text: "b" }]);
	let app = App::with_config(Config::default().with_duplicate_key_warnings(false));
	let (_app, root) = mount_with(
		app,
		r#"<ul id="app"><li z-for="item in items" z-key="item.id">{{ item.text }}</li></ul>"#,
		object! { items: items.clone() },
	);
	assert_eq!(texts(&root, "li"), ["b"]);
}

#[test]
fn events_call_handlers_and_inline_statements() {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let save = Function::named("save", {
		let seen = seen.clone();
		move |args| {
			let prevented = matches!(args.first(), Some(Value::Event(e)) if e.default_prevented());
			seen.borrow_mut().push(format!("save {}", prevented));
			Ok(Value::Undefined)
		}
	});
	let clicks = Ref::new(0);
	let (_app, root) = mount(
		r#"<div id="app">
			<button id="save" @click.prevent="save">save</button>
			<button id="once" z-on:click.once="clicks += 1">once</button>
			<input id="echo" @input="last = $event.target.value">
		</div>"#,
		object! { save: save, clicks: clicks.clone(), last: "" },
	);

	root.query_selector("#save").unwrap().click();
	assert_eq!(*seen.borrow(), ["save true"]);

	let once = root.query_selector("#once").unwrap();
	once.click();
	once.click();
	assert_eq!(clicks.get_untracked(), Value::from(1));

	let echo = root.query_selector("#echo").unwrap();
	echo.type_text("hello");
	let event = Event::new("input");
	echo.dispatch_event(&event);
	assert!(!event.default_prevented());
}

#[test]
fn handler_errors_are_reported_not_raised() {
	let app = App::new();
	let errors = Rc::new(RefCell::new(Vec::new()));
	app.hooks().add_hook(Hook::on_error({
		let errors = errors.clone();
		move |error, phase, _| {
			errors.borrow_mut().push((phase, error.to_string()));
			Ok(())
		}
	}));
	let (_app, root) = mount_with(
		app,
		r#"<div id="app"><button @click="nope()">x</button><p>{{ also.missing }}</p></div>"#,
		object! {},
	);
	assert_eq!(root.query_selector("p").unwrap().text_content(), "");

	root.query_selector("button").unwrap().click();
	let errors = errors.borrow();
	assert_eq!(errors.len(), 2);
	assert_eq!(errors[0].0, Phase::Expression);
	assert_eq!(errors[1].0, Phase::Event);
	assert!(errors[1].1.contains("nope"));
}

#[test]
fn model_binds_text_inputs_both_ways() {
	let name = Ref::new("ada");
	let age = Ref::new(1);
	let (_app, root) = mount(
		r#"<form id="app"><input id="name" z-model.trim="name"><input id="age" z-model.number="age"><p>{{ name }}/{{ age + 1 }}</p></form>"#,
		object! { name: name.clone(), age: age.clone() },
	);
	let input = root.query_selector("#name").unwrap();
	assert_eq!(input.value(), "ada");

	input.type_text("  grace ");
	assert_eq!(name.get_untracked(), Value::from("grace"));

	root.query_selector("#age").unwrap().type_text("41");
	assert_eq!(age.get_untracked(), Value::from(41));
	tick();
	assert_eq!(texts(&root, "p"), ["grace/42"]);

	name.set("linus");
	tick();
	assert_eq!(input.value(), "linus");
}

#[test]
fn model_binds_checkboxes_radios_and_selects() {
	let state = reactive(object! {
		agreed: false,
		colors: vec!["red"],
		size: "m",
		fruit: "pear",
	});
	let (_app, root) = mount(
		r#"<form id="app">
			<input id="agree" type="checkbox" z-model="state.agreed">
			<input id="red" type="checkbox" value="red" z-model="state.colors">
			<input id="blue" type="checkbox" value="blue" z-model="state.colors">
			<input id="s" type="radio" value="s" z-model="state.size">
			<input id="m" type="radio" value="m" z-model="state.size">
			<select z-model="state.fruit"><option>apple</option><option>pear</option></select>
		</form>"#,
		object! { state: state.clone() },
	);
	let state = state.as_object().unwrap();
	let find = |id: &str| root.query_selector(id).unwrap();

	assert!(find("#red").checked());
	assert!(!find("#blue").checked());
	assert!(find("#m").checked());
	assert_eq!(find("select").value(), "pear");

	find("#agree").click();
	assert_eq!(state.get("agreed"), Value::from(true));

	find("#blue").click();
	find("#red").click();
	assert_eq!(state.get("colors").as_array().unwrap().join(","), "blue");

	find("#s").click();
	assert_eq!(state.get("size"), Value::from("s"));

	find("select").select("apple");
	assert_eq!(state.get("fruit"), Value::from("apple"));

	state.set("size", "m");
	tick();
	assert!(find("#m").checked());
	assert!(!find("#s").checked());
}

#[test]
fn bound_attributes_class_and_style() {
	let state = reactive(object! {
		active: true,
		extra: vec!["wide"],
		color: "red",
		busy: false,
		label: "go",
	});
	let (_app, root) = mount(
		r#"<button id="app" class="btn" :class="[{ active: state.active }, state.extra]" :style="{ color: state.color, fontSize: '12px' }" :disabled="state.busy" z-bind:title="state.label">x</button>"#,
		object! { state: state.clone() },
	);
	assert_eq!(root.attribute("class").as_deref(), Some("btn active wide"));
	assert_eq!(root.style_property("color").as_deref(), Some("red"));
	assert_eq!(root.style_property("font-size").as_deref(), Some("12px"));
	assert!(!root.has_attribute("disabled"));
	assert_eq!(root.attribute("title").as_deref(), Some("go"));

	let state = state.as_object().unwrap();
	state.set("active", false);
	state.set("color", ());
	state.set("busy", true);
	tick();
	assert_eq!(root.attribute("class").as_deref(), Some("btn wide"));
	assert_eq!(root.style_property("color"), None);
	assert_eq!(root.style_property("font-size").as_deref(), Some("12px"));
	assert_eq!(root.attribute("disabled").as_deref(), Some(""));
}

#[test]
fn content_and_visibility_directives() {
	let state = reactive(object! { message: "<b>hi</b>", visible: true });
	let (_app, root) = mount(
		r#"<div id="app"><p id="text" z-text="state.message"></p><p id="html" z-html="state.message"></p><p id="show" style="display: flex" z-show="state.visible">x</p></div>"#,
		object! { state: state.clone() },
	);
	let find = |id: &str| root.query_selector(id).unwrap();
	assert_eq!(find("#text").text_content(), "<b>hi</b>");
	assert_eq!(find("#html").query_selector("b").unwrap().text_content(), "hi");
	assert_eq!(find("#show").style_property("display").as_deref(), Some("flex"));

	state.as_object().unwrap().set("visible", false);
	tick();
	assert_eq!(find("#show").style_property("display").as_deref(), Some("none"));

	state.as_object().unwrap().set("visible", true);
	tick();
	assert_eq!(find("#show").style_property("display").as_deref(), Some("flex"));
}

#[test]
fn before_compile_can_skip_subtrees() {
	let app = App::new();
	app.hooks().add_hook(Hook::before_compile(|node, _, _| Ok(!node.has_attribute("data-raw"))));
	let (_app, root) = mount_with(
		app,
		r#"<div id="app"><p data-raw>{{ x }}</p><p>{{ x }}</p></div>"#,
		object! { x: 1 },
	);
	assert_eq!(texts(&root, "p"), ["{{ x }}", "1"]);
}

#[test]
fn custom_prefix_and_delimiters() {
	let app = App::with_config(Config::default().with_prefix("v-").with_delimiters("[[", "]]"));
	let (_app, root) = mount_with(
		app,
		r#"<div id="app"><p v-if="on">[[ label ]]</p><p z-if="on">{{ label }}</p></div>"#,
		object! { on: true, label: "ok" },
	);
	assert_eq!(texts(&root, "p"), ["ok", "{{ label }}"]);
}

#[test]
fn objects_key_lists_by_identity() {
	let (a, b, c) = (object! { name: "a" }, object! { name: "b" }, object! { name: "c" });
	let items = Ref::new(vec![a.clone(), b.clone(), c.clone()]);
	let (_app, root) = mount(
		r#"<ul id="app"><li z-for="item in items" :key="item">{{ item.name }}</li></ul>"#,
		object! { items: items.clone() },
	);
	assert_eq!(texts(&root, "li"), ["a", "b", "c"]);

	let first = root.query_selector("li").unwrap();
	items.set(vec![c, b, a]);
	tick();
	assert_eq!(texts(&root, "li"), ["c", "b", "a"]);
	assert!(root.query_selector_all("li")[2].ptr_eq(&first));
}

#[test]
fn self_referencing_state_renders_empty_and_reports() {
	let app = App::new();
	let errors = Rc::new(RefCell::new(Vec::new()));
	app.hooks().add_hook(Hook::on_error({
		let errors = errors.clone();
		move |_, phase, source| {
			errors.borrow_mut().push((phase, source.to_owned()));
			Ok(())
		}
	}));
	let state = object! { name: "loop" };
	state.insert("me", state.clone());
	let list = Object::new();
	let nested: Value = vec![Value::from(1), Value::from(list.clone())].into();
	list.insert("list", nested.clone());

	let (_app, root) = mount_with(
		app,
		r#"<div id="app"><p>{{ state }}</p><i>{{ nested }}</i><b z-text="state.name"></b></div>"#,
		object! { state: state, nested: nested },
	);
	assert_eq!(root.query_selector("p").unwrap().text_content(), "");
	assert_eq!(root.query_selector("i").unwrap().text_content(), "");
	assert_eq!(root.query_selector("b").unwrap().text_content(), "loop");
	assert_eq!(
		*errors.borrow(),
		[(Phase::Expression, "state".to_owned()), (Phase::Expression, "nested".to_owned())]
	);
}

#[test]
fn large_numbers_interpolate_in_full() {
	let n = Ref::new(1e20);
	let (_app, root) = mount(r#"<p id="app">{{ n }}|{{ n * 10 }}|{{ -n }}</p>"#, object! { n: n.clone() });
	assert_eq!(root.text_content(), "100000000000000000000|1e+21|-100000000000000000000");

	n.set(2f64.powi(63));
	tick();
	assert_eq!(root.text_content(), "9223372036854776000|92233720368547760000|-9223372036854776000");
}
