fn main() {
    minimaldo::run()
}
