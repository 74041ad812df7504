fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The gRPC stubs are only needed by the server feature.
    #[cfg(feature = "server")]
    {
        println!("cargo:rerun-if-changed=proto/optbridge.proto");
        tonic_build::configure()
            .build_client(true)
            .build_server(true)
            .compile_protos(&["proto/optbridge.proto"], &["proto"])?;
    }
    Ok(())
}
