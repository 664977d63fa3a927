/// The purpose of this macro is to be able to generate code for each
/// primitive integer type (this means no f32 or f64).
/// You invoke the macro with the path to another macro that you would
/// like to invoke for each type.
/// Optionally you can restrict generation to either unsigned or signed
/// by typing `;unsigned` or `;signed` after the provided macro argument.
#[macro_export]
macro_rules! for_each_int_type {
    ($macro:path) => {
        $crate::for_each_int_type!($macro;unsigned);
        $crate::for_each_int_type!($macro;signed);
    };
    ($macro:path;unsigned) => {
        $macro!{usize}
        $macro!{u128}
        $macro!{u64}
        $macro!{u32}
        $macro!{u16}
        $macro!{u8}
    };
    ($macro:path;signed) => {
        $macro!{isize}
        $macro!{i128}
        $macro!{i64}
        $macro!{i32}
        $macro!{i16}
        $macro!{i8}
    }
}

/// Shorthand for building a [crate::world::section::Section] grid from cell
/// coordinates. Iterates `y`, then `z`, then `x`, which is the cell order used
/// by every grid in the format.
/// ```ignore
/// let cells = cells!(16; |x, y, z| if y == 0 { "minecraft:bedrock" } else { "minecraft:air" });
/// ```
#[macro_export]
macro_rules! cells {
    ($size:expr; |$x:ident, $y:ident, $z:ident| $body:expr) => {
        {
            let size: usize = $size;
            let mut cells = ::std::vec::Vec::with_capacity(size * size * size);
            for $y in 0..size {
                for $z in 0..size {
                    for $x in 0..size {
                        cells.push($body);
                    }
                }
            }
            cells
        }
    };
}
