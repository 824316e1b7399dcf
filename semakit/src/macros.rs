cfgenius::define! {
    pub darwin = cfg(target_vendor="apple");
    pub posix_semaphores = any(
        all(cfg(unix), not(macro(darwin))),
        cfg(target_os="fuchsia")
    );
    pub win32_semaphores = cfg(windows);
}
