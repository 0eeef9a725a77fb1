mod common;

mod closure;
mod data;
mod edge;
mod handshake;
mod negotiation;
mod renegotiation;
mod resumption;
