//! Implementations of the engine's external seams for the concrete gateway and marketplace clients.
mod shopify;
mod unzer;
