fn main() {
    // Linker and sysenv setup for firmware builds; host builds need none.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
