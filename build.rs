fn main() {
    // ESP-IDF environment (linker args, sdkconfig) is only needed for
    // firmware builds; host-side tests build without it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
