/// Shorthand way to create a Tag::Compound.
/// Example:
/// ```ignore
/// compound!{
///     ("id", "minecraft:chest"),
///     (String::from("x"), 2i32),
///     ("Items", Tag::List(ListTag::Empty))
/// }
/// ```
#[macro_export]
macro_rules! compound {
    ($(($name:expr, $value:expr)),+$(,)?) => {
        $crate::nbt::tag::Tag::Compound($crate::nbt::Map::from_iter([
            $(
                (::std::string::String::from($name), $crate::nbt::tag::Tag::from($value)),
            )+
        ]))
    };
    () => {
        $crate::nbt::tag::Tag::Compound($crate::nbt::Map::new())
    };
}

/// Shorthand way to create a Tag::List.
/// Example:
/// ```ignore
/// list![1i16, 2, 3];
/// list!["One", "Two", "Three"];
/// ```
#[macro_export]
macro_rules! list {
    ($($item:expr),+$(,)?) => {
        $crate::nbt::tag::Tag::List($crate::nbt::tag::ListTag::from(::std::vec![
            $($item),+
        ]))
    };
    () => {
        $crate::nbt::tag::Tag::List($crate::nbt::tag::ListTag::Empty)
    };
}
