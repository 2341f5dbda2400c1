pub use enclose::*;

/// `effect!((a, b) => { ... })` clones the listed handles into the effect.
#[macro_export]
macro_rules! effect {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Effect::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::Effect::new(move || { $($b)* })
    };
}

#[macro_export]
macro_rules! computed {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Computed::new($crate::macros::enclose!(($( $d_tt )*) move || $crate::Value::from({ $($b)* })))
    };
    (=> $($b:tt)*) => {
        $crate::Computed::new(move || $crate::Value::from({ $($b)* }))
    };
}

/// `object! { count: 0, name: "zest" }` builds a raw [`Object`](crate::Object).
#[macro_export]
macro_rules! object {
    () => {
        $crate::Object::new()
    };
    ($($key:ident : $value:expr),+ $(,)?) => {
        $crate::Object::new()$(.with(stringify!($key), $value))+
    };
}
