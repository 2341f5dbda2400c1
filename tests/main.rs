use zest::{batch, computed, effect, tick, Ref, Value};

mod expressions;
mod mock;
mod reactivity;
mod template;

use mock::Spy;

#[test]
fn computed_tracks_batched_writes() {
	let a = Ref::new(10);
	assert_eq!(a.get(), Value::from(10));

	let b = computed!((a) => a.get().to_number() + 10.0);
	assert_eq!(b.get(), Value::from(20));

	let mock = mock::SharedMock::new();

	mock.get().expect_trigger().times(1).return_const(());

	let _reaction = effect!((a, b, mock) => {
		mock.get().trigger(a.get().to_number() + b.get().to_number());
	});

	mock.get().checkpoint();

	mock.get().expect_trigger().withf(|v| *v == 50.0).times(1).return_const(());

	batch(|| {
		a.set(20);
		a.set(20);
		a.set(20);
		a.set(20);
	});

	assert_eq!(b.get(), Value::from(30));

	mock.get().checkpoint();
}

#[test]
fn check_invalidation() {
	let a = Ref::new(1);

	let mock = mock::SharedMock::new();

	mock.get().expect_trigger().once().return_const(());

	let _reaction = effect!((a, mock) => {
		mock.get().trigger(a.get().to_number());
	});

	mock.get().checkpoint();

	mock.get().expect_trigger().times(0).return_const(());

	batch(|| {
		a.set(1);
	});
	tick();

	mock.get().checkpoint();
}

#[test]
fn free_functions_match_the_macros() {
	let a = Ref::new(2);
	let doubled = zest::computed({
		let a = a.clone();
		move || Value::from(a.get().to_number() * 2.0)
	});
	let seen = Ref::new(0);
	let _watch = zest::effect({
		let (doubled, seen) = (doubled.clone(), seen.clone());
		move || seen.set(doubled.get())
	});
	assert_eq!(seen.get_untracked(), Value::from(4));

	a.set(5);
	tick();
	assert_eq!(seen.get_untracked(), Value::from(10));
}
