//! Generates the `auth.AuthValidation` gRPC client and server.
//!
//! Messages are hand-written prost structs in `src/rpc.rs`, so no protoc is
//! needed at build time.

fn main() {
    let validate_token = tonic_build::manual::Method::builder()
        .name("validate_token")
        .route_name("ValidateToken")
        .input_type("crate::rpc::ValidateTokenRequest")
        .output_type("crate::rpc::ValidateTokenResponse")
        .codec_path("tonic::codec::ProstCodec")
        .build();

    let service = tonic_build::manual::Service::builder()
        .name("AuthValidation")
        .package("auth")
        .method(validate_token)
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
