// Covalent Infra-Process
// Local subprocess adapter: runs connector operations as docker containers
// supervised by the calling engine.

pub mod docker_launcher;

pub use docker_launcher::DockerProcessLauncher;
