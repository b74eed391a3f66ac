use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        pub(crate) use self::windows::*;
    } else if #[cfg(unix)] {
        mod unix;
        pub(crate) use self::unix::*;

        cfg_if! {
            if #[cfg(target_arch = "x86_64")] {
                mod x86_64;
                pub(crate) use self::x86_64::{create_ctx_raw, switch_ctx_raw};
            } else if #[cfg(target_arch = "aarch64")] {
                mod aarch64;
                pub(crate) use self::aarch64::{create_ctx_raw, switch_ctx_raw};
            } else {
                compile_error!("nk-fiber: unsupported unix architecture");
            }
        }
    } else {
        compile_error!("nk-fiber: unsupported platform");
    }
}
